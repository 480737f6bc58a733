use author_store::{config::AppConfig, db};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "author_store=debug,sqlx=warn";

/// `RUST_LOG` overrides the default filter; `LOG_FORMAT=json` switches to
/// structured output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().with_target(false).init(),
        _ => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let pool = db::connect(&config).await?;
    db::migrate(&pool).await?;

    tracing::info!(max_connections = config.max_connections, "author schema is up to date");
    pool.close().await;
    Ok(())
}
