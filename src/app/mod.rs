// Application layer: use cases driven by the CLI.

pub mod commands;
