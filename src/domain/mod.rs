// Domain layer: entity model and ports (interfaces).

pub mod model;
pub mod ports;
