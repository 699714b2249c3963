pub mod config;
pub mod error;
pub mod types;

pub use config::StormConfig;
pub use error::{Result, StormError};
pub use types::*;
