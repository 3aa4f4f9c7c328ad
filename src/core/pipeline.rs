/// The outline pipeline: GEDCOM bytes → Outline orchestration.
///
/// Wires together extraction, fact derivation, theme classification,
/// block composition, and the story summary.

use chrono::Datelike;
use rayon::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::core::classifier::Classifier;
use crate::core::composer::{Composer, Outline};
use crate::core::extract::{Extraction, GedcomReader};
use crate::core::facts::DerivedFacts;
use crate::core::gedcom::ExtractError;
use crate::core::summary::StorySummary;
use crate::core::theme::{RegistryError, ThemeRegistry};

/// Documents larger than this are refused unless the builder says otherwise.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("document is larger than the {limit} byte limit")]
    DocumentTooLarge { limit: usize },
    #[error("batch was cancelled before this document was read")]
    Cancelled,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The document itself cannot be processed.
    Document,
    /// The engine was configured with an unusable registry.
    Configuration,
    /// The caller's input or request was refused.
    Caller,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Extract(_) => ErrorKind::Document,
            Self::Registry(_) => ErrorKind::Configuration,
            Self::DocumentTooLarge { .. } | Self::Cancelled | Self::Io(_) => ErrorKind::Caller,
        }
    }
}

/// The top-level outline engine. Built via `OutlineEngine::builder()`.
///
/// Holds only immutable configuration, so one engine can serve any number
/// of documents concurrently.
#[derive(Debug, Clone)]
pub struct OutlineEngine {
    registry: Arc<ThemeRegistry>,
    reference_year: i32,
    max_document_bytes: usize,
}

/// Builder for constructing an `OutlineEngine`.
pub struct OutlineEngineBuilder {
    registry_path: Option<PathBuf>,
    registry: Option<Arc<ThemeRegistry>>,
    reference_year: Option<i32>,
    max_document_bytes: usize,
}

impl OutlineEngine {
    pub fn builder() -> OutlineEngineBuilder {
        OutlineEngineBuilder {
            registry_path: None,
            registry: None,
            reference_year: None,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }

    pub fn registry(&self) -> &ThemeRegistry {
        &self.registry
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// Parse a document into its family graph and warnings without
    /// classifying it.
    pub fn extract(&self, bytes: &[u8]) -> Result<Extraction, PipelineError> {
        self.check_size(bytes.len())?;
        Ok(GedcomReader::new(self.reference_year).read(bytes)?)
    }

    /// Produce the outline for one document.
    #[instrument(skip_all, fields(bytes = bytes.len()))]
    pub fn outline(&self, bytes: &[u8]) -> Result<Outline, PipelineError> {
        let extraction = self.extract(bytes)?;
        let facts = DerivedFacts::derive(&extraction.graph);
        debug!(facts = facts.arena.len(), "derived facts");

        let classification = Classifier::new(&self.registry).classify(&facts);
        let subjects = Composer::new(&self.registry).compose(&facts, &classification);
        let summary = StorySummary::build(&extraction.graph, &facts);

        let fallbacks = subjects.iter().filter(|s| s.fallback).count();
        info!(
            subjects = subjects.len(),
            fallbacks,
            warnings = extraction.warnings.len(),
            "outline composed"
        );

        Ok(Outline::new(
            self.registry.version.clone(),
            self.reference_year,
            subjects,
            facts.arena,
            extraction.warnings,
            summary,
        ))
    }

    /// Read at most the size limit from `reader` and outline it. A reader
    /// with more bytes than the limit is refused before parsing.
    pub fn outline_reader<R: Read>(&self, reader: R) -> Result<Outline, PipelineError> {
        let mut bytes = Vec::new();
        let cap = (self.max_document_bytes as u64).saturating_add(1);
        reader.take(cap).read_to_end(&mut bytes)?;
        self.outline(&bytes)
    }

    /// Outline several documents in parallel. Results keep input order.
    /// `cancel` is checked before each document is started; documents
    /// already underway run to completion.
    pub fn outline_batch<D>(
        &self,
        documents: &[D],
        cancel: Option<&AtomicBool>,
    ) -> Vec<Result<Outline, PipelineError>>
    where
        D: AsRef<[u8]> + Sync,
    {
        info!(documents = documents.len(), "outlining batch");
        documents
            .par_iter()
            .map(|doc| {
                if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                    return Err(PipelineError::Cancelled);
                }
                self.outline(doc.as_ref())
            })
            .collect()
    }

    fn check_size(&self, len: usize) -> Result<(), PipelineError> {
        if len > self.max_document_bytes {
            return Err(PipelineError::DocumentTooLarge {
                limit: self.max_document_bytes,
            });
        }
        Ok(())
    }
}

impl OutlineEngineBuilder {
    /// Load the theme registry from a RON file at build time.
    pub fn registry_path(mut self, path: impl AsRef<Path>) -> Self {
        self.registry_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Provide a registry directly (for testing without files).
    pub fn with_registry(mut self, registry: ThemeRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Share an already loaded registry between engines.
    pub fn with_shared_registry(mut self, registry: Arc<ThemeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Year used for "not in the future" chronology checks. Defaults to the
    /// current year.
    pub fn reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    pub fn max_document_bytes(mut self, limit: usize) -> Self {
        self.max_document_bytes = limit;
        self
    }

    pub fn build(self) -> Result<OutlineEngine, PipelineError> {
        let registry = match (self.registry, self.registry_path) {
            (Some(registry), _) => registry,
            (None, Some(path)) => {
                let registry = ThemeRegistry::load_from_ron(&path)?;
                info!(
                    path = %path.display(),
                    themes = registry.themes().len(),
                    version = %registry.version,
                    "loaded theme registry"
                );
                Arc::new(registry)
            }
            (None, None) => return Err(RegistryError::NotProvided.into()),
        };
        let reference_year = self
            .reference_year
            .unwrap_or_else(|| chrono::Utc::now().year());

        Ok(OutlineEngine {
            registry,
            reference_year,
            max_document_bytes: self.max_document_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"(
        version: "unit",
        default_blocks: ["origins"],
        themes: [
            (name: "dated", when: Present("birth_year"), blocks: ["dated"]),
        ],
    )"#;

    const DOC: &[u8] = b"0 HEAD\n0 @I1@ INDI\n1 BIRT\n2 DATE 1900\n0 @I2@ INDI\n0 TRLR\n";

    fn engine() -> OutlineEngine {
        OutlineEngine::builder()
            .with_registry(ThemeRegistry::parse_ron(REGISTRY).unwrap())
            .reference_year(2024)
            .build()
            .unwrap()
    }

    #[test]
    fn build_requires_registry() {
        let err = OutlineEngine::builder().build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn missing_registry_file_is_configuration_error() {
        let err = OutlineEngine::builder()
            .registry_path("no/such/registry.ron")
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Registry(RegistryError::Io(_))));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn outline_matches_and_falls_back() {
        let outline = engine().outline(DOC).unwrap();
        assert_eq!(outline.registry_version, "unit");
        assert_eq!(outline.subjects()[0].block_ids(), vec!["dated"]);
        assert!(outline.subjects()[1].fallback);
        assert_eq!(outline.subjects()[1].block_ids(), vec!["origins"]);
    }

    #[test]
    fn size_limit_is_enforced_before_parsing() {
        let engine = OutlineEngine::builder()
            .with_registry(ThemeRegistry::parse_ron(REGISTRY).unwrap())
            .max_document_bytes(8)
            .build()
            .unwrap();
        let err = engine.outline(b"not even gedcom").unwrap_err();
        assert!(matches!(err, PipelineError::DocumentTooLarge { limit: 8 }));
        assert_eq!(err.kind(), ErrorKind::Caller);

        let err = engine.outline_reader(&b"0123456789"[..]).unwrap_err();
        assert!(matches!(err, PipelineError::DocumentTooLarge { .. }));
    }

    #[test]
    fn reader_input_matches_slice_input() {
        let engine = engine();
        assert_eq!(
            engine.outline_reader(DOC).unwrap(),
            engine.outline(DOC).unwrap()
        );
    }

    #[test]
    fn cancelled_batch_reads_nothing() {
        let cancel = AtomicBool::new(true);
        let results = engine().outline_batch(&[DOC, DOC], Some(&cancel));
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(PipelineError::Cancelled))));
    }

    #[test]
    fn batch_keeps_input_order() {
        let bad: &[u8] = b"0 HEAD\n0 @I1@ INDI\n";
        let results = engine().outline_batch(&[DOC, bad, DOC], None);
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap_err().kind(), ErrorKind::Document);
        assert!(results[2].is_ok());
    }
}
