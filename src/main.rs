mod config;
mod monsters;
mod relay;
mod routes;
mod state;
mod store;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::ServerConfig::from_env().expect("invalid configuration");
    let port = config.port;

    let store = store::Store::open(config.data_dir.clone(), config.max_map_dimension)
        .await
        .expect("data directory init failed");
    let monsters = monsters::Open5eClient::new(&config.open5e_base_url).expect("http client init failed");
    let state = state::AppState::new(config, store, monsters);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "battlemap listening");
    axum::serve(listener, app).await.expect("server failed");
}
