pub mod info_service;
pub mod quote_service;
pub mod update_service;

pub use info_service::{InfoService, InfoSummary};
pub use quote_service::{append_quotes_csv, QuoteChange, QuoteTracker};
pub use update_service::{resume_state, BatchSummary, ResumeState, UpdateReport, UpdateService};
