//! # Selective Form Filling
//!
//! Applies reconciled values to a document one field at a time. The underlying write
//! primitive is all-or-nothing per call, so a single malformed value would otherwise
//! reject the whole batch. Each field is written in its own call against the latest
//! successfully written document; a rejected field leaves that document untouched.

use crate::errors::FormError;
use crate::types::{FieldDescriptor, FieldWriteFailure, FillReport, ResolvedFieldValue};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// The PDF forms primitives the filler is built on.
pub trait FormBackend: Send + Sync {
    /// Reads the document's terminal form fields in document order.
    fn read_fields(&self, source: &Path) -> Result<Vec<FieldDescriptor>, FormError>;

    /// Writes `values` into a copy of `source` saved at `destination`.
    ///
    /// Either every value is written or nothing is saved. `source` and
    /// `destination` may be the same path.
    fn write_fields(
        &self,
        source: &Path,
        destination: &Path,
        values: &[ResolvedFieldValue],
    ) -> Result<(), FormError>;
}

/// Fills a document through a [`FormBackend`], isolating per-field failures.
pub struct SelectiveFormFiller<'a> {
    backend: &'a dyn FormBackend,
}

impl<'a> SelectiveFormFiller<'a> {
    pub fn new(backend: &'a dyn FormBackend) -> Self {
        Self { backend }
    }

    /// Writes every answered value from `source` into `destination`.
    ///
    /// Unanswered values (blank, or containing `N/A`) are skipped. A value the backend
    /// rejects is recorded in the report and does not stop later values. A structural
    /// error (the document cannot be loaded or saved) aborts the fill and is returned.
    /// When nothing could be applied, the source is re-saved unchanged so
    /// `destination` always exists.
    #[instrument(skip(self, values), fields(values = values.len()))]
    pub fn fill(
        &self,
        source: &Path,
        destination: &Path,
        values: &[ResolvedFieldValue],
    ) -> Result<FillReport, FormError> {
        let mut report = FillReport {
            destination: destination.to_path_buf(),
            ..Default::default()
        };
        let mut current: PathBuf = source.to_path_buf();

        for value in values {
            if value.is_unanswered() {
                debug!("Skipping unanswered field '{}'.", value.name);
                report.skipped_unanswered += 1;
                continue;
            }

            report.attempted += 1;
            match self
                .backend
                .write_fields(&current, destination, std::slice::from_ref(value))
            {
                Ok(()) => {
                    debug!("Wrote field '{}' = '{}'.", value.name, value.value);
                    report.applied += 1;
                    current = destination.to_path_buf();
                }
                Err(e) if e.is_structural() => {
                    warn!("Aborting fill at field '{}': {}", value.name, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Failed to write field '{}': {}", value.name, e);
                    report.failures.push(FieldWriteFailure {
                        field: value.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if report.applied == 0 {
            debug!("No field applied; saving an unchanged copy of the source.");
            self.backend.write_fields(source, destination, &[])?;
        }

        info!(
            "Filled {} of {} attempted fields ({} unanswered skipped) into '{}'.",
            report.applied,
            report.attempted,
            report.skipped_unanswered,
            destination.display()
        );
        Ok(report)
    }
}
