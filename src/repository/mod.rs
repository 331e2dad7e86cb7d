//! Persistence for downloaded flyer records.

mod metadata;

pub use metadata::{JsonMetadataStore, MemoryMetadataStore, MetadataStore, METADATA_FILENAME};
