// src/triage/mod.rs

//! Triage of candidate spool files.
//!
//! [`classify`] is a pure decision over basename and size; [`process_file`]
//! performs the decided side effect: leave in place, move to the size
//! bucket, or decode and forward to the importer.

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::import::RecordImporter;
use crate::spool::SpoolLayout;
use crate::types::Leg;

/// Accepted files must carry this suffix; anything else belongs to a
/// different producer or is still being written.
pub const CDR_SUFFIX: &str = ".cdr.xml";

/// A file of this size or larger is rejected (inclusive bound).
pub const MAX_CDR_BYTES: u64 = 3 * 1024 * 1024;

/// Outcome of triaging a candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageDecision {
    /// Wrong extension or name pattern; file is left untouched.
    Skip,
    /// Empty or oversized; file is moved to the `size` bucket.
    RejectSize,
    /// Accepted for import.
    Forward,
}

/// Classify a candidate by basename and size. Pure; no I/O.
pub fn classify(basename: &str, size: u64) -> TriageDecision {
    if !basename.ends_with(CDR_SUFFIX) {
        return TriageDecision::Skip;
    }
    if size == 0 || size >= MAX_CDR_BYTES {
        return TriageDecision::RejectSize;
    }
    TriageDecision::Forward
}

/// Decode the raw file content into the importer payload.
///
/// Legacy producers URL-encode the whole document; those payloads are
/// detected by their leading percent sign and decoded. Everything else is
/// passed through as-is.
fn decode_payload(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw).into_owned();
    if raw.first() == Some(&b'%') {
        match urlencoding::decode(&text) {
            Ok(decoded) => decoded.into_owned(),
            Err(err) => {
                warn!(error = %err, "payload looked percent-encoded but did not decode; using raw content");
                text
            }
        }
    } else {
        text
    }
}

/// Triage one candidate file and carry out the decision.
///
/// Errors (vanished file, unreadable content, failed move) bubble up so the
/// loop can log them; none of them abort a batch.
pub async fn process_file<I: RecordImporter>(
    fs: &dyn FileSystem,
    layout: &SpoolLayout,
    importer: &mut I,
    name: &str,
) -> Result<()> {
    let (basename, path) = layout.resolve(name);
    let size = fs.file_len(&path)?;

    match classify(&basename, size) {
        TriageDecision::Skip => {
            info!(file = %basename, "ignoring file without {CDR_SUFFIX} suffix");
        }
        TriageDecision::RejectSize => {
            info!(file = %basename, size, "rejecting file by size");
            // Only move once the spool root is a resolved, non-empty path.
            if !layout.root().as_os_str().is_empty() {
                let dest = layout.size_bucket().join(&basename);
                fs.rename(&path, &dest)?;
            }
        }
        TriageDecision::Forward => {
            let raw = fs.read(&path)?;
            let payload = decode_payload(&raw);
            let leg = Leg::from_basename(&basename);
            debug!(file = %basename, leg = %leg, bytes = payload.len(), "forwarding file to importer");
            importer.import(leg, payload, basename).await?;
        }
    }
    Ok(())
}
