pub mod catalog;
pub mod market_feed;
pub mod spreadsheet;
