//! JSON-RPC API Layer
//!
//! Exposes the bulk import engine as JSON-RPC 2.0 methods:
//! `import.create.v1`, `import.get.v1`, `import.list.v1`, `import.rows.v1`
//! and `import.retry.v1`.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerConfig, RpcServerError, StartedServer};
