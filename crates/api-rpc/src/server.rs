//! JSON-RPC Server
//!
//! Serves the import methods over HTTP on a local TCP address.

use crate::handler::RpcHandler;
use crate::types::{CreateImportParams, GetJobParams, JobRowsParams, ListJobsParams, RetryParams};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use reelimport_core::application::BulkImportService;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9630;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

#[derive(Error, Debug)]
pub enum RpcServerError {
    #[error("Failed to build server on {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Failed to register method {method}: {reason}")]
    Register { method: &'static str, reason: String },
}

/// A running server and the address it is bound to
pub struct StartedServer {
    pub addr: SocketAddr,
    pub handle: ServerHandle,
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

macro_rules! register {
    ($module:expr, $method:literal, $handler:expr, $params:ty, $call:ident) => {{
        let handler = Arc::clone(&$handler);
        $module
            .register_async_method($method, move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: $params = params.parse()?;
                    handler.$call(req).await
                }
            })
            .map_err(|e| RpcServerError::Register {
                method: $method,
                reason: e.to_string(),
            })?;
    }};
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, service: Arc<BulkImportService>) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(service)),
        }
    }

    /// Bind and start serving. Port 0 picks a free port (see `StartedServer::addr`).
    pub async fn start(self) -> Result<StartedServer, RpcServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| RpcServerError::Bind {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;
        let local_addr = server.local_addr().map_err(|e| RpcServerError::Bind {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;

        let mut module = RpcModule::new(());

        register!(module, "import.create.v1", self.handler, CreateImportParams, create_import);
        register!(module, "import.get.v1", self.handler, GetJobParams, get_job);
        register!(module, "import.rows.v1", self.handler, JobRowsParams, job_rows);
        register!(module, "import.retry.v1", self.handler, RetryParams, retry);

        // Parameters are optional for listing
        let handler = Arc::clone(&self.handler);
        module
            .register_async_method("import.list.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: Option<ListJobsParams> = params.parse()?;
                    handler.list_jobs(req.unwrap_or_default()).await
                }
            })
            .map_err(|e| RpcServerError::Register {
                method: "import.list.v1",
                reason: e.to_string(),
            })?;

        info!(addr = %local_addr, "JSON-RPC server started");

        Ok(StartedServer {
            addr: local_addr,
            handle: server.start(module),
        })
    }
}
