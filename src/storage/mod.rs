//! In-session storage
//!
//! Nothing here touches disk; the history log lives only as long as the process.

pub mod history;

pub use history::{HistoryError, HistoryStore, EXPORT_COLUMNS};
