//! Application startup and lifecycle management.

use crate::config::AccountConfig;
use crate::db;
use crate::services::{AccountService, PaystackClient, PgUserRepository};
use crate::{router, AppState};
use axum::Router;
use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect to PostgreSQL, run migrations and bind the HTTP listener.
    pub async fn build(config: AccountConfig) -> Result<Self, AppError> {
        let pool = db::create_pool(&config.database).await.map_err(|e| {
            tracing::error!("Failed to connect to PostgreSQL: {}", e);
            AppError::from(e)
        })?;

        db::run_migrations(&pool).await?;

        let paystack = PaystackClient::new(config.paystack.clone());
        if paystack.is_configured() {
            tracing::info!("Paystack client initialized");
        } else {
            tracing::warn!("Paystack secret key not configured - account linking will fail");
        }

        let service = AccountService::new(
            Arc::new(PgUserRepository::new(pool)),
            Arc::new(paystack),
        );

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        let router = router(AppState { config, service });

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Actual bound port (differs from the configured one when that was 0).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT or SIGTERM, then drain in-flight requests.
    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        tracing::info!("Listening on 0.0.0.0:{}", self.port);

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
