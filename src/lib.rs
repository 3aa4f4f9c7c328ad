//! Lineage Narrative: deterministic documentary outlines from family-history files.
//!
//! Reads a GEDCOM document into a typed family graph, derives facts about each
//! individual and family, matches those facts against a declarative theme
//! registry, and composes a per-subject outline of narrative blocks with the
//! facts that justified each one. Text, voice and video generation happen
//! elsewhere; this crate only produces the outline they consume.

pub mod core;
pub mod schema;

pub use crate::core::composer::{Outline, OutlineBlock, SubjectOutline};
pub use crate::core::gedcom::ExtractError;
pub use crate::core::pipeline::{ErrorKind, OutlineEngine, PipelineError};
pub use crate::core::theme::{RegistryError, ThemeRegistry};
pub use crate::schema::warning::Warning;
