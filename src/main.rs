//! Storefront E-commerce - Self-hosted shop backend

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::config::Config;
use storefront::http::{self, auth::JwtKeys, AppState};
use storefront::publisher::EventPublisher;
use storefront::services::orders::OrderLifecycle;
use storefront::store::{PgCartStore, PgOrderStore, PgUserStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = Config::from_env()?;
    let db = PgPoolOptions::new().max_connections(config.max_connections).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!("NATS unavailable at {}, order events will not be published: {}", url, e);
                None
            }
        },
        None => None,
    };

    let orders = OrderLifecycle::new(Arc::new(PgOrderStore::new(db.clone())), config.transitions, EventPublisher::new(nats));
    let state = AppState {
        db: db.clone(),
        orders,
        users: Arc::new(PgUserStore::new(db.clone())),
        carts: Arc::new(PgCartStore::new(db)),
        keys: JwtKeys::new(config.jwt_secret.as_bytes()),
    };
    let app = http::router(state);

    let address = config.bind_address();
    tracing::info!(transitions = ?config.transitions, "🚀 Storefront listening on {}", address);
    axum::serve(tokio::net::TcpListener::bind(&address).await?, app).await?;
    Ok(())
}
