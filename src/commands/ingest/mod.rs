mod aggregate;
mod classify;
mod header;
mod pipeline;
mod report_store;
mod resolve;
mod run;
mod source;
mod table;
mod taxonomy;
mod types;

#[cfg(test)]
mod tests;

pub use classify::DocumentClassifier;
pub use report_store::{REPORT_TABLES, count_rows};
pub use run::{DB_FILENAME, run};
