pub mod base;
pub mod csv_dump;
pub mod sina;

pub use base::{with_retry, DataSource, RetryPolicy, RetryingSource, Session};
pub use csv_dump::CsvDumpSource;
pub use sina::{parse_sina_quotes, SinaQuoteClient};
