mod shutdown;

use std::sync::Arc;

use axum::Router;
use blobgate_blob::provider::{self, ConnectionString};
use blobgate_blob::{BlobApiDoc, BlobAppState, BlobConfig, BlobService};
use clap::Args;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use blobgate_blob::services::{DEFAULT_CONTAINER_NAME, DEFAULT_MAX_UPLOAD_BYTES};
use shutdown::shutdown_signal;

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1:3000", env = "BLOBGATE_ADDRESS")]
    pub address: String,

    /// Storage connection string, e.g. `UseInMemoryStorage=true` or
    /// `Endpoint=http://localhost:9000;AccessKeyId=...;SecretAccessKey=...`
    #[arg(long, env = "BLOBGATE_STORAGE_CONNECTION", hide_env_values = true)]
    pub storage_connection: String,

    /// Container every request reads from and writes to
    #[arg(long, default_value = DEFAULT_CONTAINER_NAME, env = "BLOBGATE_CONTAINER_NAME")]
    pub container_name: String,

    /// Largest accepted upload request body, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "BLOBGATE_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let connection: ConnectionString = self
            .storage_connection
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid storage connection string: {}", e))?;
        let config = BlobConfig::new(self.container_name.clone(), self.max_upload_bytes)?;

        debug!("Using {} storage provider", connection.provider_name());
        let blob_service = Arc::new(BlobService::new(provider::connect(&connection)));
        let state = Arc::new(BlobAppState {
            blob_service,
            config,
        });

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(serve(self.address, state))
    }
}

/// Blob routes plus the Swagger UI, traced per request
pub fn build_application(state: Arc<BlobAppState>) -> Router {
    blobgate_blob::build_router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", BlobApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}

async fn serve(address: String, state: Arc<BlobAppState>) -> anyhow::Result<()> {
    info!(
        "Starting Blobgate on {} with container {}",
        address, state.config.default_container
    );
    let app = build_application(state);

    let listener = TcpListener::bind(&address).await?;
    info!("Blobgate listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Blobgate server exited");
    Ok(())
}
