pub mod csv;
pub mod las;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use pcs_core::pointcloud::FullCloudAccess;

use crate::error::OpenError;

/// Shared view of a reader's streaming state.
///
/// Carries the monotonically increasing processed-points counter (safe to
/// sample from another thread for progress display) and a latch for a
/// decode error that ended the stream early. The cursor contract itself
/// only signals exhaustion, so without the latch a corrupt input would be
/// indistinguishable from a short but healthy one.
#[derive(Clone, Default)]
pub struct ReaderStatus {
    processed: Arc<AtomicU64>,
    error: Arc<OnceLock<String>>,
}

impl ReaderStatus {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// The error that ended the stream, if it did not end by exhaustion.
    pub fn error(&self) -> Option<&str> {
        self.error.get().map(String::as_str)
    }

    pub(crate) fn count_one(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    // Only the first error is kept; everything after it is fallout.
    pub(crate) fn record_error(&self, message: String) {
        let _ = self.error.set(message);
    }
}

/// Open a point cloud file, sniffing the format from the extension.
///
/// Returns the paired header and point cursor, never partially populated,
/// plus the reader's shared status handle.
pub fn open_point_cloud(path: &Path) -> Result<(FullCloudAccess, ReaderStatus), OpenError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| OpenError::UnknownExtension(path.to_path_buf()))?;

    match extension.to_ascii_lowercase().as_str() {
        "las" | "laz" => las::open_las(path),
        "csv" | "txt" => csv::open_csv(path),
        other => Err(OpenError::UnsupportedFormat(other.to_string())),
    }
}

/// One decoded point record, shared by the format cursors.
#[derive(Debug, Clone, Default)]
pub(crate) struct Record {
    pub geometry: pcs_core::pointcloud::PtGeometry<f64>,
    pub color: Option<pcs_core::pointcloud::PtColor<f64>>,
    pub attributes: Vec<(String, pcs_core::pointcloud::GenericValue)>,
}

impl Record {
    pub fn attribute_by_name(&self, name: &str) -> Option<pcs_core::pointcloud::GenericValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}
