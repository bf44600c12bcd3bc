//! Manifest file reader
//!
//! A manifest is a YAML document whose top level mapping holds an `applications`
//! sequence of per-application mappings.

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::errors::PushError;
use crate::filesys::file::File;

/// Top level key holding the application list
pub const APPLICATIONS_KEY: &str = "applications";

/// Parsed manifest, holding the application list for the lifetime of the reader
#[derive(Debug, Clone)]
pub struct ManifestReader {
    origin: String,
    applications: Vec<Mapping>,
}

impl ManifestReader {
    /// Read and parse a manifest file
    pub async fn read(file: &File) -> Result<Self, PushError> {
        let origin = file.path().display().to_string();
        let contents = file.read_string().await.map_err(|e| match e {
            PushError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                PushError::MissingManifest(origin.clone())
            }
            other => other,
        })?;
        Self::parse(&contents, &origin)
    }

    /// Parse manifest contents; `origin` names the source in error messages
    pub fn parse(contents: &str, origin: &str) -> Result<Self, PushError> {
        let document: Value = serde_yaml::from_str(contents).map_err(|e| {
            PushError::ManifestParsing(format!("Malformed YAML file: {} ({})", origin, e))
        })?;

        let Value::Mapping(top) = document else {
            return Err(PushError::ManifestParsing(format!(
                "Could not parse the manifest file into a map: {}",
                origin
            )));
        };

        let applications = match top.get(APPLICATIONS_KEY) {
            Some(Value::Sequence(entries)) => entries
                .iter()
                .map(|entry| match entry {
                    Value::Mapping(app) => Ok(app.clone()),
                    _ => Err(PushError::ManifestParsing(format!(
                        "Entries of the '{}' block must be maps: {}",
                        APPLICATIONS_KEY, origin
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(PushError::ManifestParsing(format!(
                    "The '{}' block must be a list: {}",
                    APPLICATIONS_KEY, origin
                )))
            }
            None => {
                return Err(PushError::ManifestParsing(
                    "Manifest file does not start with an 'applications' block.".to_string(),
                ))
            }
        };

        debug!("Parsed manifest {} with {} application(s)", origin, applications.len());

        Ok(Self {
            origin: origin.to_string(),
            applications,
        })
    }

    /// Where the manifest came from
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Number of applications declared
    pub fn len(&self) -> usize {
        self.applications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }

    /// The mapping of one application.
    ///
    /// With no name the first entry is returned; otherwise the entry whose `name`
    /// equals `name`.
    pub fn application_info(&self, name: Option<&str>) -> Result<Mapping, PushError> {
        match name {
            None => self.applications.first().cloned().ok_or_else(|| {
                PushError::ManifestParsing(format!(
                    "Manifest file does not declare any application: {}",
                    self.origin
                ))
            }),
            Some(name) => self
                .applications
                .iter()
                .find(|app| app.get("name").and_then(Value::as_str) == Some(name))
                .cloned()
                .ok_or_else(|| {
                    PushError::ManifestParsing(format!(
                        "Manifest file does not contain an app named {}.",
                        name
                    ))
                }),
        }
    }
}
