pub mod config;
pub mod error;
pub mod identity;

pub use config::Config;
pub use error::*;
pub use identity::*;
