pub mod archive;
pub mod config;
pub mod error;
pub mod types;

pub use archive::*;
pub use config::*;
pub use error::*;
pub use types::*;
