//! Caller-facing filesystem facade / 面向调用方的文件系统封装
//!
//! Normalizes every path before handing it to the driver. File operations
//! reject the root path and the root directory can never be deleted.

use bytes::Bytes;

use super::{
    DirRecord, DriverBox, Entry, FileRecord, Metadata, StorageError, StorageResult, WriteOptions,
};
use crate::utils::normalize_path;

#[derive(Clone)]
pub struct Filesystem {
    driver: DriverBox,
}

impl Filesystem {
    pub fn new(driver: DriverBox) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &DriverBox {
        &self.driver
    }

    fn file_path(path: &str) -> StorageResult<String> {
        let normalized = normalize_path(path)?;
        if normalized.is_empty() {
            return Err(StorageError::InvalidPath(format!("{:?} does not name a file", path)));
        }
        Ok(normalized)
    }

    /// Source and destination of a copy or move, which must differ / 复制或移动的源和目标（不能相同）
    fn transfer_paths(path: &str, new_path: &str) -> StorageResult<(String, String)> {
        let from = Self::file_path(path)?;
        let to = Self::file_path(new_path)?;
        if from == to {
            return Err(StorageError::InvalidPath(format!(
                "{:?} and {:?} are the same file",
                path, new_path
            )));
        }
        Ok((from, to))
    }

    pub async fn exists(&self, path: &str) -> StorageResult<bool> {
        let path = Self::file_path(path)?;
        self.driver.has(&path).await
    }

    pub async fn read(&self, path: &str) -> StorageResult<Bytes> {
        let path = Self::file_path(path)?;
        Ok(self.driver.read(&path).await?.contents)
    }

    pub async fn write(
        &self,
        path: &str,
        contents: impl Into<Bytes>,
        options: &WriteOptions,
    ) -> StorageResult<FileRecord> {
        let path = Self::file_path(path)?;
        self.driver.write(&path, contents.into(), options).await
    }

    pub async fn update(
        &self,
        path: &str,
        contents: impl Into<Bytes>,
        options: &WriteOptions,
    ) -> StorageResult<FileRecord> {
        let path = Self::file_path(path)?;
        self.driver.update(&path, contents.into(), options).await
    }

    pub async fn delete(&self, path: &str) -> StorageResult<()> {
        let path = Self::file_path(path)?;
        self.driver.delete(&path).await
    }

    /// Delete a directory recursively; the root is refused / 递归删除目录（禁止删除根目录）
    pub async fn delete_directory(&self, dir: &str) -> StorageResult<()> {
        let dir = normalize_path(dir)?;
        if dir.is_empty() {
            return Err(StorageError::RootViolation);
        }
        self.driver.delete_dir(&dir).await
    }

    pub async fn create_directory(&self, dir: &str, options: &WriteOptions) -> StorageResult<DirRecord> {
        let dir = Self::file_path(dir)?;
        self.driver.create_dir(&dir, options).await
    }

    pub async fn copy(&self, path: &str, new_path: &str) -> StorageResult<()> {
        let (path, new_path) = Self::transfer_paths(path, new_path)?;
        self.driver.copy(&path, &new_path).await
    }

    pub async fn rename(&self, path: &str, new_path: &str) -> StorageResult<()> {
        let (path, new_path) = Self::transfer_paths(path, new_path)?;
        self.driver.rename(&path, &new_path).await
    }

    /// List a directory; `""` or `"/"` is the root / 列出目录
    pub async fn list_contents(&self, dir: &str, recursive: bool) -> StorageResult<Vec<Entry>> {
        let dir = normalize_path(dir)?;
        self.driver.list_contents(&dir, recursive).await
    }

    pub async fn get_metadata(&self, path: &str) -> StorageResult<Metadata> {
        let path = Self::file_path(path)?;
        self.driver.get_metadata(&path).await
    }

    pub async fn get_size(&self, path: &str) -> StorageResult<u64> {
        let path = Self::file_path(path)?;
        self.driver.get_size(&path).await
    }

    pub async fn get_mimetype(&self, path: &str) -> StorageResult<String> {
        let path = Self::file_path(path)?;
        self.driver.get_mimetype(&path).await
    }

    pub async fn get_timestamp(&self, path: &str) -> StorageResult<i64> {
        let path = Self::file_path(path)?;
        self.driver.get_timestamp(&path).await
    }

    pub async fn get_url(&self, path: &str) -> StorageResult<String> {
        let path = Self::file_path(path)?;
        self.driver.get_url(&path).await
    }

    pub async fn get_signed_download_url(
        &self,
        path: &str,
        expires: u64,
        host_override: Option<&str>,
        force_https: bool,
    ) -> StorageResult<String> {
        let path = Self::file_path(path)?;
        self.driver
            .get_signed_download_url(&path, expires, host_override, force_https)
            .await
    }
}
