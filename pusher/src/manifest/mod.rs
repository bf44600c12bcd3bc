//! Deployment manifest handling

pub mod reader;

pub use reader::ManifestReader;
