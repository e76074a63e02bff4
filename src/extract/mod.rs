// src/extract/mod.rs

use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::ArchiveError;

/// One data row of the table, keyed by the original header column names
/// (`REF_DATE`, `GEO`, `VALUE`, …). The `VALUE` token may be a number or
/// the dataset's ".." not-available sentinel.
pub type RawRow = HashMap<String, String>;

/// Pull the named member out of the archive bytes and return its
/// decompressed text.
///
/// A missing member means the configured table id no longer matches what
/// the host publishes; that comes back as
/// [`ArchiveError::MemberNotFound`] so it is never confused with a
/// network failure. The text is decoded lossily and a leading UTF-8 BOM
/// (StatCan writes one) is stripped.
pub fn unzip_member(bytes: &[u8], member: &str) -> Result<String, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut entry = match archive.by_name(member) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(ArchiveError::MemberNotFound {
                name: member.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut buf)?;
    let text = String::from_utf8_lossy(&buf);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    debug!(member, chars = text.len(), "extracted archive member");
    Ok(text.to_string())
}

/// Parse header-bearing delimited text into one [`RawRow`] per data row.
///
/// The first line is the header. Empty lines are skipped. A malformed row
/// (wrong field count, or a record-level read error) is dropped and
/// parsing continues; the dropped count is logged. A table with no header
/// or no data rows parses to an empty vec rather than an error — noticing
/// that zero rows are unusable is the caller's job.
pub fn parse_table(text: &str) -> Vec<RawRow> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(h) => h.iter().map(str::to_string).collect(),
        Err(_) => return Vec::new(),
    };
    if headers.is_empty() {
        return Vec::new();
    }

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };
        if record.len() != headers.len() {
            dropped += 1;
            continue;
        }
        rows.push(
            headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect(),
        );
    }

    if dropped > 0 {
        warn!(dropped, kept = rows.len(), "dropped malformed table rows");
    }
    rows
}
