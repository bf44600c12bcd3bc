//! Application bits: locating and packaging the artifact

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::PushError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::platform::ArtifactArchive;
use crate::utils::sha256_hash;

/// Directories never shipped with the bits
const SKIPPED_DIRS: &[&str] = &[".git", ".svn", ".hg"];

/// Archive formats uploaded as they are
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "war", "jar", "ear"];

/// Where the artifact lives and what it is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocation {
    Directory(PathBuf),
    File(PathBuf),
}

impl ArtifactLocation {
    pub fn path(&self) -> &Path {
        match self {
            ArtifactLocation::Directory(p) | ArtifactLocation::File(p) => p,
        }
    }
}

/// Resolve `app_path` against the build workspace
pub async fn resolve(workspace: &Path, app_path: &str) -> Result<ArtifactLocation, PushError> {
    let candidate = Path::new(app_path);
    let path = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        workspace.join(candidate)
    };

    if Dir::new(&path).exists().await {
        return Ok(ArtifactLocation::Directory(path));
    }
    if File::new(&path).exists().await {
        return Ok(ArtifactLocation::File(path));
    }
    Err(PushError::MissingArtifact(path.display().to_string()))
}

/// Turn the artifact into the upload payload
pub async fn package(location: &ArtifactLocation) -> Result<ArtifactArchive, PushError> {
    let archive = match location {
        ArtifactLocation::File(path) if is_archive(path) => {
            let file = File::new(path);
            ArtifactArchive {
                file_name: file.name(),
                bytes: file.read_bytes().await?,
            }
        }
        ArtifactLocation::File(path) => {
            let file = File::new(path);
            let name = file.name();
            let entries = vec![(name.clone(), path.clone())];
            ArtifactArchive {
                file_name: format!("{}.zip", name),
                bytes: zip_in_background(entries).await?,
            }
        }
        ArtifactLocation::Directory(path) => {
            let dir = Dir::new(path);
            let entries = dir.walk_files(SKIPPED_DIRS)?;
            ArtifactArchive {
                file_name: "application.zip".to_string(),
                bytes: zip_in_background(entries).await?,
            }
        }
    };

    debug!(
        "Packaged {} into {} ({} bytes, sha256 {})",
        location.path().display(),
        archive.file_name,
        archive.bytes.len(),
        sha256_hash(&archive.bytes)
    );
    Ok(archive)
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ARCHIVE_EXTENSIONS.iter().any(|a| e.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

async fn zip_in_background(entries: Vec<(String, PathBuf)>) -> Result<Vec<u8>, PushError> {
    tokio::task::spawn_blocking(move || zip_entries(&entries))
        .await
        .map_err(|e| PushError::Internal(format!("Packaging task failed: {}", e)))?
}

/// Zip `(name, path)` entries in memory
pub fn zip_entries(entries: &[(String, PathBuf)]) -> Result<Vec<u8>, PushError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, path) in entries {
        let contents = std::fs::read(path)?;
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| PushError::Internal(format!("Could not add {} to archive: {}", name, e)))?;
        writer.write_all(&contents)?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| PushError::Internal(format!("Could not finish archive: {}", e)))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_relative_directory() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("site")).unwrap();

        let location = resolve(tmp.path(), "site").await.unwrap();
        assert_eq!(location, ArtifactLocation::Directory(tmp.path().join("site")));

        let workspace = resolve(tmp.path(), ".").await.unwrap();
        assert!(matches!(workspace, ArtifactLocation::Directory(_)));
    }

    #[tokio::test]
    async fn test_resolve_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve(tmp.path(), "target/app.war").await.unwrap_err();
        assert!(matches!(err, PushError::MissingArtifact(p) if p.ends_with("app.war")));
    }

    #[tokio::test]
    async fn test_archive_uploaded_as_is() {
        let tmp = tempfile::tempdir().unwrap();
        let war = tmp.path().join("app.war");
        std::fs::write(&war, b"PK-not-really").unwrap();

        let archive = package(&ArtifactLocation::File(war)).await.unwrap();
        assert_eq!(archive.file_name, "app.war");
        assert_eq!(archive.bytes, b"PK-not-really");
    }

    #[tokio::test]
    async fn test_directory_is_zipped() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("index.html"), "<h1>hi</h1>").unwrap();
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        std::fs::write(tmp.path().join(".git/config"), "x").unwrap();

        let archive = package(&ArtifactLocation::Directory(tmp.path().to_path_buf()))
            .await
            .unwrap();
        assert_eq!(archive.file_name, "application.zip");

        let zip = zip::ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
        let names: Vec<_> = zip.file_names().collect();
        assert_eq!(names, vec!["index.html"]);
    }
}
