use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cardioguard::config::Config;
use cardioguard::server::{AppState, build_router};
use cardioguard::store::InMemoryBackend;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardioguard=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("invalid configuration");
    let addr = config.bind_addr;

    // TODO: swap for the production persistence service once its client
    // crate is published; the in-memory backend is for local integration
    // testing against the broker's development environment.
    let backend = InMemoryBackend::new();

    let app = build_router(AppState::new(config, backend));

    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listen address");
    axum::serve(listener, app).await.expect("server error");
}
