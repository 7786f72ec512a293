pub mod config;
pub mod error;

pub use config::{Config, SiweConfig};
pub use error::{ApiError, ApiResult};
