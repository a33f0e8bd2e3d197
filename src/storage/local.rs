use crate::errors::Result;
use crate::storage::base::ArtifactStore;
use async_trait::async_trait;
use log::{info, warn};
use std::path::PathBuf;

/// 本地目录存储，先写临时文件再重命名，保证不会留下写了一半的文件
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn temp_path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!(".{}.tmp", name))
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    fn describe(&self) -> String {
        format!("local directory {}", self.dir.display())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path_for(name)).await?)
    }

    async fn write(&self, name: &str, content: &[u8]) -> Result<()> {
        // 确保目录存在
        tokio::fs::create_dir_all(&self.dir).await?;

        let temp_path = self.temp_path_for(name);
        let final_path = self.path_for(name);

        let written = match tokio::fs::write(&temp_path, content).await {
            Ok(()) => tokio::fs::rename(&temp_path, &final_path).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove temp file {}: {}", temp_path.display(), cleanup);
                }
            }
            return Err(e.into());
        }

        info!("Data saved locally at {}", final_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_then_reports_existence() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("out"));

        assert!(!store.exists("sp500_data_2024-03-12.csv").await.unwrap());
        store.write("sp500_data_2024-03-12.csv", b"date\n").await.unwrap();
        assert!(store.exists("sp500_data_2024-03-12.csv").await.unwrap());

        let content = std::fs::read_to_string(dir.path().join("out/sp500_data_2024-03-12.csv")).unwrap();
        assert_eq!(content, "date\n");
        assert!(!dir.path().join("out/.sp500_data_2024-03-12.csv.tmp").exists());
    }

    #[tokio::test]
    async fn failed_write_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        // 目标路径是已存在的目录，重命名会失败
        std::fs::create_dir(dir.path().join("sp500_data_2024-03-12.csv")).unwrap();
        std::fs::write(dir.path().join("sp500_data_2024-03-12.csv").join("keep"), b"x").unwrap();
        let store = LocalStore::new(dir.path());

        assert!(store.write("sp500_data_2024-03-12.csv", b"date\n").await.is_err());
        assert!(!dir.path().join(".sp500_data_2024-03-12.csv.tmp").exists());
    }
}
