//! Log bundle export

mod archive;

pub use archive::{export, LogEntry, EMPTY_ARCHIVE};
