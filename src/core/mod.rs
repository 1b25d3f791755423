pub mod config;
pub mod error;
pub mod types;

pub use config::CognitionConfig;
pub use error::{Result, SimError};
