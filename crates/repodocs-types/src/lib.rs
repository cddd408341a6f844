//! Shared value types and error taxonomy for the repodocs documentation
//! extractor, split out the way `riptide-types` is split out of the
//! teacher's workspace to keep the concern-crates free of circular
//! dependencies.

pub mod document;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod state;
pub mod strategy;

pub use document::{Document, DocumentMetadata};
pub use error::{RepodocsError, Result};
pub use fetch::FetchResponse;
pub use manifest::{Manifest, ManifestOptions, ManifestSource, TriState};
pub use state::{PageState, SyncState, STATE_SCHEMA_VERSION};
pub use strategy::StrategyKind;
