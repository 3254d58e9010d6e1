use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tickmirror::logging;
use tickmirror_application::config;

#[derive(Parser, Debug)]
#[command(name = "tickmirror")]
#[command(about = "Stream Kite ticks for a watch-list into a Google Sheet.", version)]
struct Cli {
    /// Config file path (TOML). If omitted, uses env TICKMIRROR_CONFIG, then built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let config_path = cli.config.or_else(|| {
        std::env::var("TICKMIRROR_CONFIG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    });
    let config = match config::load_or_default(config_path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = logging::init_tracing(&config.log) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = init_metrics() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    if let Err(err) = tickmirror::run(config) {
        tracing::error!(error = %err, "tickmirror stopped");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[cfg(feature = "prometheus")]
fn init_metrics() -> Result<Option<SocketAddr>, String> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let Some(raw) = std::env::var("TICKMIRROR_METRICS_ADDR").ok() else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let addr: SocketAddr = raw
        .parse()
        .map_err(|err| format!("invalid TICKMIRROR_METRICS_ADDR (expected host:port): {err}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| format!("failed to install prometheus exporter: {err}"))?;

    tracing::info!(metrics_addr = %addr, "prometheus metrics exporter enabled");
    Ok(Some(addr))
}

#[cfg(not(feature = "prometheus"))]
fn init_metrics() -> Result<Option<SocketAddr>, String> {
    if std::env::var("TICKMIRROR_METRICS_ADDR").is_ok_and(|v| !v.trim().is_empty()) {
        return Err("metrics exporter requires tickmirror feature `prometheus`".to_string());
    }
    Ok(None)
}
