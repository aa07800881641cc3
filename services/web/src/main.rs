use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod error;
mod identity;
mod ledger;
mod middleware;
mod models;
mod repositories;
mod routes;
mod state;
mod time_window;
mod validation;

use tokio::net::TcpListener;

use crate::identity::{IdentityClient, IdentityConfig};
use crate::ledger::EventLedger;
use crate::repositories::EventRepository;
use crate::state::AppState;
use common::database::{DatabaseConfig, health_check, init_pool};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting sleep-ledger web service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Identity provider client, constructed once and injected
    let identity_config = IdentityConfig::from_env()?;
    let identity = IdentityClient::new(identity_config);

    let ledger = EventLedger::new(EventRepository::new(pool));

    let app_state = AppState { ledger, identity };

    info!("Web service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let bind_addr =
        std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Web service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
