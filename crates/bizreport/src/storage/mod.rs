pub mod filesystem;
pub mod manifest;
pub mod persister;

pub use filesystem::ArtifactStore;
pub use manifest::{estimate_pages, Manifest, ManifestBuilder, ManifestEntry, ResourceUsage};
pub use persister::{ArtifactPersister, GeneratedArtifact, PersistenceError};
