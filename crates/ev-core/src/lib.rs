pub mod bundle;
pub mod command;
pub mod document;
pub mod error;
pub mod value;

pub use bundle::*;
pub use command::*;
pub use document::*;
pub use error::EngineError;
pub use value::*;
