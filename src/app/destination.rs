//! Per-run destination directory
//!
//! Each run writes into a fresh directory with a random lowercase
//! alphanumeric name. A name collision or a failed creation is not an
//! error: the run falls back to the output root itself.

use std::io;
use std::path::{Path, PathBuf};

use rand::rngs::OsRng;
use rand::Rng;

use crate::constants::output;
use crate::errors::FilesystemError;

/// Where a run's files go
#[derive(Debug)]
pub struct Destination {
    /// Directory files are written into
    pub path: PathBuf,
    /// Name shown in status lines: the directory name, or `.` on fallback
    pub label: String,
    /// Why the random directory was not used, if it was not
    pub fallback: Option<FilesystemError>,
}

impl Destination {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Random directory name drawn from `[a-z0-9]` with the OS RNG
pub fn random_dir_name(len: usize) -> String {
    (0..len)
        .map(|_| {
            let index = OsRng.gen_range(0..output::RANDOM_DIR_ALPHABET.len());
            output::RANDOM_DIR_ALPHABET[index] as char
        })
        .collect()
}

/// Creates a randomly named directory under `root`, or falls back to `root`
pub async fn prepare(root: &Path, name_len: usize) -> Destination {
    prepare_named(root, &random_dir_name(name_len)).await
}

/// Creates `root/name`, or falls back to `root` if it exists or cannot be made
pub async fn prepare_named(root: &Path, name: &str) -> Destination {
    let path = root.join(name);
    match tokio::fs::create_dir(&path).await {
        Ok(()) => {
            tracing::info!("Created destination directory {}", path.display());
            Destination {
                path,
                label: name.to_string(),
                fallback: None,
            }
        }
        Err(e) => {
            let error = if e.kind() == io::ErrorKind::AlreadyExists {
                FilesystemError::AlreadyExists { path }
            } else {
                FilesystemError::CreateFailed { path, source: e }
            };
            tracing::warn!("{}; writing to {}", error, root.display());
            Destination {
                path: root.to_path_buf(),
                label: output::FALLBACK_DIR.to_string(),
                fallback: Some(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_random_dir_name_alphabet_and_length() {
        let name = random_dir_name(output::RANDOM_DIR_LEN);
        assert_eq!(name.len(), 10);
        assert!(name
            .bytes()
            .all(|b| output::RANDOM_DIR_ALPHABET.contains(&b)));
        assert_eq!(random_dir_name(0), "");
    }

    #[tokio::test]
    async fn test_prepare_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let destination = prepare(temp_dir.path(), 10).await;
        assert!(!destination.is_fallback());
        assert!(destination.path.is_dir());
        assert_eq!(destination.path.parent(), Some(temp_dir.path()));
        assert_eq!(destination.label.len(), 10);
    }

    #[tokio::test]
    async fn test_collision_falls_back_to_root() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("taken")).unwrap();

        let destination = prepare_named(temp_dir.path(), "taken").await;
        assert_eq!(destination.path, temp_dir.path());
        assert_eq!(destination.label, ".");
        assert!(matches!(
            destination.fallback,
            Some(FilesystemError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_creation_failure_falls_back_to_root() {
        let temp_dir = TempDir::new().unwrap();
        let missing_parent = temp_dir.path().join("no/such");

        let destination = prepare_named(&missing_parent, "dir").await;
        assert_eq!(destination.path, missing_parent);
        assert!(matches!(
            destination.fallback,
            Some(FilesystemError::CreateFailed { .. })
        ));
    }
}
