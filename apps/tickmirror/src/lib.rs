pub mod logging;
pub mod prompt;

use std::sync::Arc;
use tickmirror_application::config::{self, Config};
use tickmirror_application::instruments::resolve_instruments;
use tickmirror_application::session::acquire_session;
use tickmirror_application::sheet_setup;
use tickmirror_application::streaming::{BatchFlusher, MirrorContext, TickHandler};
use tickmirror_domain::repositories::spreadsheet::Worksheet;
use tickmirror_domain::value_objects::feed_mode::FeedMode;
use tickmirror_infrastructure::kite::{KiteConnect, KiteTicker, ReconnectPolicy, KITE_TICKER_URL};
use tickmirror_infrastructure::sheets::{GoogleAuth, GoogleSheets};
use tokio::sync::watch;

struct FeedSettings {
    api_key: String,
    access_token: String,
    mode: FeedMode,
    reconnect: ReconnectPolicy,
}

/// Startup (session, instruments, worksheet) runs on the calling thread; the
/// streaming phase runs on a tokio runtime until the feed closes or Ctrl-C.
pub fn run(config: Config) -> Result<(), String> {
    let api_key = config::resolve_api_key(&config.kite)?;
    let api_secret = config::resolve_api_secret(&config.kite)?;
    tracing::info!(
        exchange = %config.kite.exchange,
        spreadsheet = %config.sheet.spreadsheet,
        worksheet = %config.sheet.worksheet,
        "tickmirror starting"
    );

    let kite = KiteConnect::new(api_key.clone(), api_secret)?;
    let mut prompt = prompt::stdin_prompt();
    let session = acquire_session(&kite, &config.kite.access_token_path, &mut prompt)?;
    let kite = kite.with_access_token(session.access_token.clone());

    let instruments =
        resolve_instruments(&kite, &config.kite.exchange, &config.instruments.symbols)?;

    let auth = GoogleAuth::from_service_account_file(&config.sheet.credentials_path)?;
    let sheets = GoogleSheets::new(auth)?;
    let (worksheet, rows) = sheet_setup::initialize(&sheets, &config.sheet, &instruments)?;

    let ctx = MirrorContext::new(instruments, rows);
    let feed = FeedSettings {
        api_key,
        access_token: session.access_token,
        mode: config.kite.mode,
        reconnect: ReconnectPolicy {
            max_tries: config.kite.reconnect_max_tries,
            max_delay: config.kite.reconnect_max_delay(),
            ..ReconnectPolicy::default()
        },
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("failed to init tokio runtime: {err}"))?;
    let result = runtime.block_on(stream(ctx, worksheet, &config, feed));
    // The ticker thread may still be blocked on a socket read.
    runtime.shutdown_background();
    result
}

async fn stream(
    ctx: MirrorContext,
    worksheet: Arc<dyn Worksheet>,
    config: &Config,
    feed: FeedSettings,
) -> Result<(), String> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let flusher = Arc::new(BatchFlusher::new(
        Arc::clone(&ctx.buffer),
        worksheet,
        config.flush.interval(),
    ));
    let flush_task = tokio::spawn(flusher.run(shutdown_rx));

    let handler = TickHandler::new(ctx, feed.mode);
    let feed_task = tokio::task::spawn_blocking(move || -> Result<(), String> {
        KiteTicker::run_with_reconnect(
            KITE_TICKER_URL,
            &feed.api_key,
            &feed.access_token,
            &handler,
            &feed.reconnect,
        )
        .map_err(|err| err.to_string())
    });

    let outcome = tokio::select! {
        joined = feed_task => match joined {
            Ok(Ok(())) => {
                tracing::info!("feed closed, shutting down");
                Ok(())
            }
            Ok(Err(err)) => Err(err),
            Err(err) => Err(format!("feed task failed: {err}")),
        },
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => tracing::info!("interrupt received, shutting down"),
                Err(err) => tracing::warn!(error = %err, "failed to listen for interrupt, shutting down"),
            }
            Ok(())
        }
    };

    let _ = shutdown_tx.send(true);
    if let Err(err) = flush_task.await {
        tracing::error!(error = %err, "flush task ended abnormally");
    }
    outcome
}
