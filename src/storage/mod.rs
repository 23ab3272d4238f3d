use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod filesystem;
pub mod manager;

pub use error::{StorageError, StorageResult};
pub use filesystem::Filesystem;
pub use manager::{DriverBox, DriverFactory, StorageManager};

/// Entry kind / 条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// File entry information / 文件条目信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub path: String,
    /// Size in bytes, files only / 文件大小（仅文件）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Seconds since epoch, 0 when unknown / 修改时间（未知时为0）
    pub timestamp: i64,
}

impl Entry {
    pub fn file(path: String, size: u64, timestamp: i64) -> Self {
        Self { kind: EntryKind::File, path, size: Some(size), timestamp }
    }

    pub fn dir(path: String, timestamp: i64) -> Self {
        Self { kind: EntryKind::Dir, path, size: None, timestamp }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Per-call write options / 写入选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    /// Size reported in the returned record; the stored length follows the contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl WriteOptions {
    pub fn mimetype(mut self, val: &str) -> Self {
        self.mimetype = Some(val.to_string());
        self
    }

    pub fn size(mut self, val: u64) -> Self {
        self.size = Some(val);
        self
    }

    /// Overlay `other` on top of `self`; set fields of `other` win / 合并选项，后者优先
    pub fn merged_with(&self, other: &WriteOptions) -> WriteOptions {
        WriteOptions {
            mimetype: other.mimetype.clone().or_else(|| self.mimetype.clone()),
            size: other.size.or(self.size),
        }
    }
}

/// Result of a successful write / 写入结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub path: String,
    #[serde(skip)]
    pub contents: Bytes,
    pub mimetype: String,
    pub size: u64,
}

/// Result of a successful read / 读取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResult {
    pub contents: Bytes,
    pub path: String,
}

/// Result of a successful directory creation / 创建目录结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirRecord {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// File metadata / 文件元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub dirname: String,
    pub path: String,
    pub timestamp: i64,
    pub mimetype: String,
    pub size: u64,
}

/// Filesystem adapter interface implemented by every disk driver / 文件系统适配器接口
///
/// Paths handed to an adapter are already normalized by [`Filesystem`]:
/// no leading slash, root is the empty string.
#[async_trait]
pub trait FilesystemAdapter: Send + Sync {
    /// Driver name / 驱动名称
    fn name(&self) -> &str;

    /// Write a new file / 写入新文件
    async fn write(&self, path: &str, contents: Bytes, options: &WriteOptions) -> StorageResult<FileRecord>;

    /// Overwrite an existing file / 更新文件
    async fn update(&self, path: &str, contents: Bytes, options: &WriteOptions) -> StorageResult<FileRecord> {
        self.write(path, contents, options).await
    }

    /// Read a whole file / 读取文件
    async fn read(&self, path: &str) -> StorageResult<ReadResult>;

    /// Delete a file / 删除文件
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Copy a file / 复制文件
    async fn copy(&self, path: &str, new_path: &str) -> StorageResult<()>;

    /// Rename a file / 重命名文件
    async fn rename(&self, path: &str, new_path: &str) -> StorageResult<()>;

    /// Delete a directory and everything under it / 递归删除目录
    async fn delete_dir(&self, dir: &str) -> StorageResult<()>;

    /// Create a directory / 创建目录
    async fn create_dir(&self, dir: &str, options: &WriteOptions) -> StorageResult<DirRecord>;

    /// Check whether a file exists / 检查文件是否存在
    async fn has(&self, path: &str) -> StorageResult<bool>;

    /// List directory contents / 列出目录内容
    async fn list_contents(&self, dir: &str, recursive: bool) -> StorageResult<Vec<Entry>>;

    /// Get file metadata / 获取元数据
    async fn get_metadata(&self, path: &str) -> StorageResult<Metadata>;

    async fn get_size(&self, path: &str) -> StorageResult<u64> {
        Ok(self.get_metadata(path).await?.size)
    }

    async fn get_mimetype(&self, path: &str) -> StorageResult<String> {
        Ok(self.get_metadata(path).await?.mimetype)
    }

    async fn get_timestamp(&self, path: &str) -> StorageResult<i64> {
        Ok(self.get_metadata(path).await?.timestamp)
    }

    /// Public URL of a file (if supported) / 获取文件URL
    async fn get_url(&self, _path: &str) -> StorageResult<String> {
        Err(StorageError::Unsupported("get_url"))
    }

    /// Time-limited signed download URL (if supported) / 获取签名下载URL
    async fn get_signed_download_url(
        &self,
        _path: &str,
        _expires: u64,
        _host_override: Option<&str>,
        _force_https: bool,
    ) -> StorageResult<String> {
        Err(StorageError::Unsupported("get_signed_download_url"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_options_merge() {
        let defaults = WriteOptions::default().mimetype("image/png").size(10);
        let call = WriteOptions::default().mimetype("text/plain");
        let merged = defaults.merged_with(&call);
        assert_eq!(merged.mimetype.as_deref(), Some("text/plain"));
        assert_eq!(merged.size, Some(10));

        let merged = WriteOptions::default().merged_with(&WriteOptions::default());
        assert_eq!(merged, WriteOptions::default());
    }

    #[test]
    fn test_entry_serializes_like_listing_record() {
        let json = serde_json::to_value(Entry::dir("docs".to_string(), 0)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "dir", "path": "docs", "timestamp": 0}));

        let json = serde_json::to_value(Entry::file("a.txt".to_string(), 3, 7)).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["size"], 3);
    }
}
