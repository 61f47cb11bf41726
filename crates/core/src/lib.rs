// Reelimport Core - Domain Logic, Ports & Use Cases
// NO infrastructure dependencies (hexagonal architecture)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, IngestError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
