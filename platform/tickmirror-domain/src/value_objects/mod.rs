pub mod feed_mode;
pub mod instrument;
pub mod row_assignment;
pub mod sheet_value;
pub mod tick;
