mod select;
mod tables;

pub use select::select_justified_rows;
pub use tables::{extract_tables, filter_status_tables};

#[cfg(test)]
use select::status_is_justified;
#[cfg(test)]
use tables::TableParser;
