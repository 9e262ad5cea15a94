use crate::domain::ports::Storage;
use crate::utils::error::{Result, SocialError};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

impl Storage for LocalStorage {
    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path);
        fs::read(&full_path).map_err(|e| SocialError::storage(full_path.display().to_string(), e))
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);
        let path_str = full_path.display().to_string();

        if let Some(parent) = full_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SocialError::storage(&path_str, e))?;
        }

        // 先寫入暫存檔再改名，讀者只會看到完整檔案
        let file_name = full_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                SocialError::storage(
                    &path_str,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
                )
            })?;
        let temp_path = full_path.with_file_name(format!(".{}.tmp", file_name));

        fs::write(&temp_path, data).map_err(|e| SocialError::storage(&path_str, e))?;
        if let Err(e) = fs::rename(&temp_path, &full_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(SocialError::storage(path_str, e));
        }

        tracing::debug!("Wrote {} bytes to {}", data.len(), path_str);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        storage.write_file("nested/graph.json", b"{}").unwrap();
        assert_eq!(storage.read_file("nested/graph.json").unwrap(), b"{}");
        assert!(!temp_dir.path().join("nested/.graph.json.tmp").exists());
    }

    #[test]
    fn test_missing_file_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        match storage.read_file("absent.json") {
            Err(SocialError::Storage { path, source }) => {
                assert!(path.ends_with("absent.json"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected storage error, got {:?}", other),
        }
    }
}
