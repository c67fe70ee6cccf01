use anyhow::{bail, Context};
use futures_util::future::join_all;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use submit_gate::config::{Config, LogFormat};
use submit_gate::http::DocumentApi;

fn init_logging(config: &Config) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load Config
    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config);

    info!("Starting document submitter...");
    info!(
        "Endpoint: {} | Limit: {} requests per {}",
        config.endpoint, config.request_limit, config.window_unit
    );

    let path = config.document_path.display().to_string();
    let document = tokio::fs::read_to_string(&config.document_path)
        .await
        .with_context(|| format!("Failed to read document {}", path))?;
    serde_json::from_str::<serde_json::Value>(&document)
        .with_context(|| format!("Document {} is not valid JSON", path))?;

    let api = DocumentApi::new(&config).context("Failed to initialize API client")?;

    let results = tokio::select! {
        results = join_all((0..config.repeat).map(|_| api.create_document(&document, &config.signature))) => Some(results),
        _ = tokio::signal::ctrl_c() => None,
    };

    api.close().await;

    let Some(results) = results else {
        warn!("Interrupted, pending submissions abandoned");
        bail!("Interrupted before all {} submissions completed", config.repeat);
    };

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        bail!("{} of {} submissions failed", failed, config.repeat);
    }

    info!("All {} submissions completed.", config.repeat);
    Ok(())
}
