//! HNL injury bot: binary entrypoint.
//! Loads configuration, wires the service and serves the HTTP surface until
//! interrupted.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hnl_injury_bot::config::{BotTable, LogFormat, Settings};
use hnl_injury_bot::metrics::Metrics;
use hnl_injury_bot::{build_state, router};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hnl_injury_bot=info,warn"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown requested");
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let settings = Settings::from_env();
    init_tracing(settings.log_format);

    let table = BotTable::load_default().context("loading bot configuration")?;
    info!(
        version = table.version,
        clubs = table.clubs.len(),
        sites = table.sites.len(),
        "bot configuration loaded"
    );

    let state = build_state(&table, &settings)?;
    let service = state.service.clone();

    let mut app = router(state);
    match Metrics::init(settings.cache_ttl.as_secs()) {
        Ok(metrics) => app = app.merge(metrics.router()),
        Err(e) => warn!(error = %e, "prometheus recorder not installed; /metrics disabled"),
    }

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", settings.port))
        .await
        .with_context(|| format!("binding port {}", settings.port))?;
    info!(port = settings.port, prefix = %settings.command_prefix, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    service.shutdown().await;
    info!("bye");
    Ok(())
}
