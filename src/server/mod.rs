pub mod api;

use crate::gateway::Gateway;
use self::api::{ router, AppState };
use log::{ info, warn };
use std::error::Error;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct Server {
    addr: String,
    state: AppState,
}

impl Server {
    pub fn new(addr: String, gateway: Arc<Gateway>, api_keys: Vec<String>) -> Self {
        Self {
            addr,
            state: AppState::new(gateway, api_keys),
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.state.api_keys.is_empty() {
            warn!("No API_KEYS configured; every /api/ai request will be rejected");
        }

        let listener = TcpListener::bind(&self.addr).await.map_err(|e|
            format!("Failed to bind HTTP server to {}: {}", self.addr, e)
        )?;
        info!("HTTP server listening on: http://{}", self.addr);

        axum::serve(listener, router(self.state.clone()))
            .with_graceful_shutdown(shutdown_signal()).await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
