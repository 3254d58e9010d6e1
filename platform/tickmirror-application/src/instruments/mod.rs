use tickmirror_domain::repositories::catalog::InstrumentCatalog;
use tickmirror_domain::services::watchlist::{filter_watchlist, missing_symbols};
use tickmirror_domain::value_objects::instrument::Instrument;

/// Fetches the exchange catalog and keeps the watch-list entries, in catalog
/// order. Any catalog error is fatal for the caller.
pub fn resolve_instruments(
    catalog: &dyn InstrumentCatalog,
    exchange: &str,
    symbols: &[String],
) -> Result<Vec<Instrument>, String> {
    let all = catalog.list_instruments(exchange).map_err(|err| {
        tracing::error!(exchange, error = %err, "error fetching instruments");
        format!("failed to fetch {exchange} instruments: {err}")
    })?;
    let catalog_size = all.len();
    let resolved = filter_watchlist(all, symbols);

    let missing = missing_symbols(&resolved, symbols);
    if !missing.is_empty() {
        tracing::warn!(exchange, missing = ?missing, "watch-list symbols not found in catalog");
    }
    tracing::info!(
        exchange,
        catalog_size,
        symbols = ?resolved.iter().map(|i| i.trading_symbol.as_str()).collect::<Vec<_>>(),
        "fetched selected instruments"
    );
    Ok(resolved)
}
