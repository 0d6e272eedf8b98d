//! In-memory ZIP assembly for the modpack download.

use std::io::{Cursor, Write};
use zip::{CompressionMethod, DateTime, ZipWriter, result::ZipResult, write::SimpleFileOptions};

/// Deflate level used for every entry.
pub const COMPRESSION_LEVEL: i64 = 6;

/// Accumulates entries into a ZIP held entirely in memory.
///
/// Every entry gets the same compression settings and the fixed DOS epoch
/// timestamp, so the same inputs in the same order always produce the same
/// archive bytes.
pub struct ModpackArchive {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    entries: usize,
}

impl ModpackArchive {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            entries: 0,
        }
    }

    fn options() -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(COMPRESSION_LEVEL))
            .last_modified_time(DateTime::default())
            .large_file(false)
    }

    /// Add one file under `name`. Slashes in the name become folders inside
    /// the archive.
    pub fn add_file(&mut self, name: &str, data: &[u8]) -> ZipResult<()> {
        let options = if data.len() as u64 >= u32::MAX as u64 {
            Self::options().large_file(true)
        } else {
            Self::options()
        };
        self.writer.start_file(name, options)?;
        self.writer.write_all(data)?;
        self.entries += 1;
        Ok(())
    }

    /// Number of entries added so far.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Write the central directory and return the archive bytes.
    pub fn finish(self) -> ZipResult<Vec<u8>> {
        Ok(self.writer.finish()?.into_inner())
    }
}

impl Default for ModpackArchive {
    fn default() -> Self {
        Self::new()
    }
}
