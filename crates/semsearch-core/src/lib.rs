pub mod config;
pub mod error;
pub mod types;

pub use config::SemsearchConfig;
pub use error::{Result, SemsearchError};
pub use types::*;
