pub mod kite;
pub mod sheets;
