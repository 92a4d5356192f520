//! Node images: manifest model and extraction from images

pub mod extractor;
pub mod manifest;

pub use extractor::ManifestExtractor;
pub use manifest::NodeManifest;
