// Copyright 2025 JUnit Traces Contributors
// SPDX-License-Identifier: Apache-2.0

//! Report Extractor: test suites from every report inside an archive.

use junit_traces_core::report::parse_report;
use junit_traces_core::TestSuite;
use std::io::{Read, Seek};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Largest report entry that is buffered and parsed.
pub const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Parse every entry of `archive` as a test report.
///
/// Entries are buffered whole. An entry that cannot be read or parsed is
/// logged and skipped; the remaining entries are still processed.
pub fn extract_suites<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Vec<TestSuite> {
    extract_suites_bounded(archive, MAX_ENTRY_BYTES)
}

/// [`extract_suites`] with an explicit per-entry size bound.
///
/// The bound applies to bytes actually decompressed; the size declared in
/// the archive header is not trusted.
pub fn extract_suites_bounded<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    max_entry_bytes: u64,
) -> Vec<TestSuite> {
    let mut suites = Vec::new();
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(index, error = %e, "Skipping unreadable archive entry");
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let mut contents = Vec::new();
        if let Err(e) = entry
            .by_ref()
            .take(max_entry_bytes.saturating_add(1))
            .read_to_end(&mut contents)
        {
            warn!(entry = %name, error = %e, "Skipping unreadable archive entry");
            continue;
        }
        if contents.len() as u64 > max_entry_bytes {
            warn!(entry = %name, limit = max_entry_bytes, "Skipping oversized archive entry");
            continue;
        }

        match parse_report(&contents) {
            Ok(parsed) => {
                debug!(entry = %name, suites = parsed.len(), "Parsed test report");
                suites.extend(parsed);
            }
            Err(e) => warn!(entry = %name, error = %e, "Skipping entry that is not a test report"),
        }
    }
    suites
}
