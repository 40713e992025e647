use anyhow::Context;
use tracing_subscriber::EnvFilter;

mod app;
mod auth;
mod cart;
mod config;
mod error;
mod exchange;
mod favorites;
mod history;
mod jobs;
mod mail;
mod notifications;
mod products;
mod reviews;
mod sellers;
mod state;
mod storage;
mod users;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("nexomarket=info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let state = state::AppState::init().await?;
    sqlx::migrate!("./migrations")
        .run(&state.db)
        .await
        .context("run migrations")?;

    jobs::spawn_offer_sweep(state.clone());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app::build_app(state))
        .await
        .context("server error")?;
    Ok(())
}
