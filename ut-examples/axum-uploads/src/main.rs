use anyhow::Result;
use tracing_subscriber::EnvFilter;
use ut_core::UtConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = UtConfig::from_env();

    // UPLOADTHING_LOG_LEVEL wins over RUST_LOG
    let filter = match config.snapshot().log_level() {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let addr = axum_uploads::listen_addr(&config);
    let app = axum_uploads::build(config, None)?;

    ut_axum::listen(app, addr).await
}
