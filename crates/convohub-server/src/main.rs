mod config;

use anyhow::bail;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use convohub_api::{AppStateInner, MediaStorage, TokenConfig};
use convohub_db::Database;
use convohub_gateway::hub::RoomHub;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "convohub=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    let db = Database::open(&config.db_path)?;

    // Administrative commands run against the database and exit
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => {}
        [cmd, username] if cmd == "promote" => return promote(&db, username),
        _ => bail!("usage: convohub [promote <username>]"),
    }

    if config.uses_placeholder_secret() {
        warn!("CONVOHUB_JWT_SECRET is unset or a placeholder; tokens can be forged");
    }

    let tokens = TokenConfig::new(
        config.jwt_secret.clone(),
        chrono::Duration::minutes(config.access_token_minutes),
        chrono::Duration::days(config.refresh_token_days),
    );
    let media = MediaStorage::new(config.media_dir.clone()).await?;
    let state = AppStateInner::new(db, tokens, RoomHub::new(config.chat_buffer), media);

    let app = convohub_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("ConvoHub server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn promote(db: &Database, username: &str) -> anyhow::Result<()> {
    if !db.set_superuser(username, true)? {
        bail!("no such user: {username}");
    }
    info!("{} is now a superuser", username);
    Ok(())
}
