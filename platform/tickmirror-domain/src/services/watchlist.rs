use crate::value_objects::instrument::Instrument;
use std::collections::HashSet;

pub const DEFAULT_WATCHLIST: [&str; 9] = [
    "INFY",
    "HCLTECH",
    "ITC",
    "RELIANCE",
    "SBICARD",
    "LT",
    "TCS",
    "ICICIBANK",
    "ASIANPAINT",
];

/// Keeps catalog entries whose trading symbol is on the watch-list.
///
/// Output follows catalog order, not watch-list order.
pub fn filter_watchlist(catalog: Vec<Instrument>, symbols: &[String]) -> Vec<Instrument> {
    let wanted: HashSet<&str> = symbols.iter().map(String::as_str).collect();
    catalog
        .into_iter()
        .filter(|inst| wanted.contains(inst.trading_symbol.as_str()))
        .collect()
}

/// Watch-list symbols with no matching catalog entry.
pub fn missing_symbols<'a>(resolved: &[Instrument], symbols: &'a [String]) -> Vec<&'a str> {
    let found: HashSet<&str> = resolved.iter().map(|i| i.trading_symbol.as_str()).collect();
    symbols
        .iter()
        .map(String::as_str)
        .filter(|s| !found.contains(s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Instrument> {
        vec![
            Instrument::new(2953217, "TCS"),
            Instrument::new(1, "NOTWATCHED"),
            Instrument::new(408065, "INFY"),
            Instrument::new(738561, "RELIANCE"),
        ]
    }

    #[test]
    fn keeps_catalog_order() {
        let symbols = vec!["INFY".to_string(), "TCS".to_string()];
        let resolved = filter_watchlist(catalog(), &symbols);
        let names: Vec<&str> = resolved.iter().map(|i| i.trading_symbol.as_str()).collect();
        assert_eq!(names, vec!["TCS", "INFY"]);
    }

    #[test]
    fn reports_symbols_absent_from_catalog() {
        let symbols = vec!["INFY".to_string(), "LT".to_string()];
        let resolved = filter_watchlist(catalog(), &symbols);
        assert_eq!(missing_symbols(&resolved, &symbols), vec!["LT"]);
    }
}
