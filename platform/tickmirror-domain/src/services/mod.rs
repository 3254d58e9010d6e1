pub mod row_layout;
pub mod watchlist;
