pub mod config;
pub mod instruments;
pub mod session;
pub mod sheet_setup;
pub mod streaming;
