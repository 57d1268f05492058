//! `statprobe-agent` -- remote resource usage probe.
//!
//! Polls a host's `/_stats` endpoint on a fixed interval and prints a
//! warning line to stdout for every metric over its threshold. Logs go to
//! stderr. Runs until SIGINT or SIGTERM.
//!
//! # Environment variables
//!
//! | Variable               | Required | Default                                  | Description                    |
//! |------------------------|----------|------------------------------------------|--------------------------------|
//! | `STATS_URL`            | no       | `http://srv.msk01.gigacorp.local/_stats` | Endpoint to poll               |
//! | `CHECK_INTERVAL_SECS`  | no       | `10`                                     | Seconds between checks         |
//! | `FETCH_TIMEOUT_SECS`   | no       | --                                       | Per-request timeout            |
//! | `STRICT_FIELD_PARSING` | no       | `false`                                  | Reject non-numeric fields      |
//! | `LOG_FORMAT`           | no       | `text`                                   | `text` or `json` (stderr)      |
//! | `RUST_LOG`             | no       | `statprobe_agent=info,statprobe_core=info` | Log filter                   |

use statprobe_agent::config::{AgentConfig, LogFormat};
use statprobe_agent::fetcher::HttpStatsSource;
use statprobe_agent::monitor::Monitor;
use statprobe_agent::shutdown;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = AgentConfig::from_env();
    init_tracing(config.as_ref().map(|c| c.log_format).unwrap_or_default());

    let config = config.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        stats_url = %config.stats_url,
        interval_secs = config.interval.as_secs(),
        fetch_timeout_secs = config.fetch_timeout.map(|t| t.as_secs()),
        field_parsing = ?config.field_parsing,
        "Starting statprobe-agent",
    );

    let source = HttpStatsSource::new(
        config.stats_url.clone(),
        config.fetch_timeout,
        config.field_parsing,
    )
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build HTTP client");
        std::process::exit(1);
    });

    let cancel = CancellationToken::new();
    let signal_task = shutdown::cancel_on_signal(cancel.clone());

    let mut monitor = Monitor::new(source, std::io::stdout(), config.interval);
    monitor.run(&cancel).await;

    cancel.cancel();
    shutdown::join_signal_task(signal_task).await;
    tracing::info!("Shutdown complete");
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "statprobe_agent=info,statprobe_core=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
