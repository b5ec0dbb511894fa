//! Zip bundling of whichever log files exist
//!
//! Export is best effort: a file that is missing or unreadable is left out
//! of the archive and never turns into an error for the caller.

use std::io::{Cursor, Write};

use tracing::{debug, info, trace};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::errors::BridgeError;
use crate::filesys::file::File;

/// End-of-central-directory record of a zip with no entries
pub const EMPTY_ARCHIVE: [u8; 22] = [
    0x50, 0x4b, 0x05, 0x06, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// A source file and the name it takes inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub source: File,
    pub archive_name: String,
}

impl LogEntry {
    pub fn new(source: File, archive_name: impl Into<String>) -> Self {
        Self {
            source,
            archive_name: archive_name.into(),
        }
    }
}

/// Bundle the existing entries, in order, into an in-memory zip archive
pub async fn export(entries: &[LogEntry]) -> Vec<u8> {
    let mut contents = Vec::with_capacity(entries.len());
    for entry in entries {
        info!("  Compressing \"{}\"", entry.source.path().display());
        if !entry.source.exists().await {
            debug!("  File does not exist");
            continue;
        }
        trace!("  File exists");
        match entry.source.read_bytes().await {
            Ok(bytes) => contents.push((entry.archive_name.as_str(), bytes)),
            Err(e) => debug!("  Could not read file: {}", e),
        }
    }

    match build_archive(&contents) {
        Ok(archive) => archive,
        Err(e) => {
            debug!("  Could not compress logs: {}", e);
            EMPTY_ARCHIVE.to_vec()
        }
    }
}

fn build_archive(contents: &[(&str, Vec<u8>)]) -> Result<Vec<u8>, BridgeError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for (name, bytes) in contents {
        zip.start_file(*name, options)?;
        zip.write_all(bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}
