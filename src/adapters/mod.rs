// Adapters layer: concrete codecs and storage backends for the domain ports.

pub mod json;
pub mod storage;
pub mod xml;

pub use json::JsonCodec;
pub use storage::LocalStorage;
pub use xml::XmlCodec;
