use std::{env, error::Error};

use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use tokio::{fs, net};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{
    layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter,
};

use locate_desk::{http, store, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = env::var("LOCATE_DESK_CONFIG")
        .unwrap_or_else(|_| "config.toml".to_owned());
    let config = fs::read_to_string(&path).await?;
    let config = toml::from_str::<Config>(&config)?;

    let source = store::HttpSource::new(&config.source)?;
    let tickets = store::Cache::new(source, config.source.cache_ttl);
    let state = http::AppState::new(tickets, config.admin, &config.jwt);

    // Sign-in needs the open tickets, so read them before taking requests.
    state.tickets().snapshot().await;

    let origins = config
        .http
        .cors
        .allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_origin(origins);

    let app = http::router(state).layer(cors);

    let listener = net::TcpListener::bind(config.http.server.addr).await?;
    info!(addr = %config.http.server.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
