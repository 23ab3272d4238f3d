//! OSS文件系统适配器 / OSS filesystem adapter
//!
//! Every operation is one pass-through call to the injected [`OssClient`];
//! `rename` is copy + delete and `delete_dir` is a listing walk + one batch
//! delete, neither of them atomic.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use url::Url;

use super::client::{ListObjectsRequest, ObjectSummary, OssClient, OssError, PutOptions};
use crate::storage::{
    DirRecord, Entry, EntryKind, FileRecord, FilesystemAdapter, Metadata, ReadResult, StorageError,
    StorageResult, WriteOptions,
};
use crate::utils::{dirname, guess_mimetype, PathPrefix};

/// Keys requested per listing page / 每页列举数量
const LIST_MAX_KEYS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkMode {
    /// Direct children only / 仅直接子项
    Shallow,
    /// Files of the whole subtree / 整个子树的文件
    Recursive,
    /// Files and subdirectories of the whole subtree / 整个子树的文件和子目录
    Descendants,
}

/// OSS适配器
pub struct OssAdapter {
    client: Box<dyn OssClient>,
    prefix: PathPrefix,
    cname: Option<String>,
    options: WriteOptions,
}

impl OssAdapter {
    pub fn new(client: Box<dyn OssClient>, prefix: &str) -> Self {
        Self {
            client,
            prefix: PathPrefix::new(prefix),
            cname: None,
            options: WriteOptions::default(),
        }
    }

    /// Rewrite URL hosts to a custom domain / 使用自定义域名
    pub fn with_cname(mut self, cname: Option<&str>) -> Self {
        self.cname = cname.filter(|c| !c.is_empty()).map(|c| c.to_string());
        self
    }

    /// Options merged under every write / 每次写入合并的固定选项
    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    fn bucket(&self) -> &str {
        self.client.bucket()
    }

    /// Listing prefix for a directory: key with one trailing slash, root is the bare prefix
    fn dir_key(&self, dir: &str) -> String {
        let dir = dir.trim_matches('/');
        if dir.is_empty() {
            self.prefix.as_str().to_string()
        } else {
            format!("{}/", self.prefix.apply(dir))
        }
    }

    fn entry_path(&self, key: &str) -> String {
        self.prefix.strip(key).trim_end_matches('/').to_string()
    }

    /// Translate a client error, keeping the cause / 转换客户端错误
    fn map_err(&self, operation: &'static str, path: &str, err: OssError) -> StorageError {
        tracing::warn!("OSS {} failed: path={}, error={}", operation, path, err);
        match err {
            OssError::NotFound { .. } => StorageError::NotFound { path: path.to_string() },
            OssError::AccessDenied { .. } => StorageError::PermissionDenied {
                path: path.to_string(),
                source: Box::new(err),
            },
            other => StorageError::backend(operation, path, other),
        }
    }

    /// All pages of one delimiter listing / 获取一次分隔符列举的全部分页
    async fn list_all(
        &self,
        operation: &'static str,
        dir_key: &str,
    ) -> StorageResult<(Vec<ObjectSummary>, Vec<String>)> {
        let mut objects = Vec::new();
        let mut prefixes = Vec::new();
        let mut marker = String::new();

        loop {
            let request = ListObjectsRequest::new(dir_key)
                .marker(&marker)
                .max_keys(LIST_MAX_KEYS);
            let page = self
                .client
                .list_objects(&request)
                .await
                .map_err(|e| self.map_err(operation, dir_key, e))?;

            objects.extend(page.objects);
            prefixes.extend(page.common_prefixes);

            if !page.is_truncated {
                break;
            }
            match page.next_marker {
                Some(next) if !next.is_empty() && next != marker => marker = next,
                _ => break,
            }
        }

        Ok((objects, prefixes))
    }

    /// Depth-first, pre-order walk below `dir_key` / 深度优先遍历目录
    fn walk<'a>(
        &'a self,
        operation: &'static str,
        dir_key: String,
        mode: WalkMode,
        top: bool,
        out: &'a mut Vec<Entry>,
    ) -> BoxFuture<'a, StorageResult<()>> {
        async move {
            let (objects, prefixes) = self.list_all(operation, &dir_key).await?;

            for object in objects {
                let timestamp = object.last_modified.map(|t| t.timestamp()).unwrap_or(0);

                if object.key == dir_key && object.size == 0 {
                    // Directory marker of the listed directory itself
                    let path = self.entry_path(&object.key);
                    if top && !path.is_empty() {
                        out.push(Entry::dir(path, timestamp));
                    }
                    continue;
                }

                out.push(Entry::file(self.entry_path(&object.key), object.size, timestamp));
            }

            for common in prefixes {
                match mode {
                    WalkMode::Shallow => out.push(Entry::dir(self.entry_path(&common), 0)),
                    WalkMode::Recursive => {
                        self.walk(operation, common, mode, false, out).await?;
                    }
                    WalkMode::Descendants => {
                        out.push(Entry::dir(self.entry_path(&common), 0));
                        self.walk(operation, common, mode, false, out).await?;
                    }
                }
            }

            Ok(())
        }
        .boxed()
    }

    /// Replace the host of `url` / 替换URL主机名
    fn replace_host(url: &str, host: &str) -> Result<String, OssError> {
        let mut parsed = Url::parse(url)?;
        parsed.set_host(Some(host))?;
        Ok(parsed.to_string())
    }
}

#[async_trait]
impl FilesystemAdapter for OssAdapter {
    fn name(&self) -> &str {
        "oss"
    }

    async fn write(&self, path: &str, contents: Bytes, options: &WriteOptions) -> StorageResult<FileRecord> {
        let key = self.prefix.apply(path);
        let options = self.options.merged_with(options);
        let size = options.size.unwrap_or(contents.len() as u64);
        let mimetype = options
            .mimetype
            .unwrap_or_else(|| guess_mimetype(path, &contents));

        tracing::debug!("OSS写入: key={}, size={}, mimetype={}", key, size, mimetype);

        let put = PutOptions {
            content_type: Some(mimetype.clone()),
        };
        self.client
            .put_object(&key, contents.clone(), &put)
            .await
            .map_err(|e| self.map_err("write", path, e))?;

        Ok(FileRecord {
            kind: EntryKind::File,
            path: path.to_string(),
            contents,
            mimetype,
            size,
        })
    }

    async fn read(&self, path: &str) -> StorageResult<ReadResult> {
        let key = self.prefix.apply(path);
        let contents = self
            .client
            .get_object(&key)
            .await
            .map_err(|e| self.map_err("read", path, e))?;
        Ok(ReadResult { contents, path: path.to_string() })
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let key = self.prefix.apply(path);
        tracing::debug!("OSS删除: key={}", key);
        self.client
            .delete_object(&key)
            .await
            .map_err(|e| self.map_err("delete", path, e))
    }

    async fn copy(&self, path: &str, new_path: &str) -> StorageResult<()> {
        let key = self.prefix.apply(path);
        let new_key = self.prefix.apply(new_path);
        tracing::debug!("OSS复制: {} -> {}", key, new_key);
        self.client
            .copy_object(&key, &new_key)
            .await
            .map_err(|e| self.map_err("copy", path, e))
    }

    async fn rename(&self, path: &str, new_path: &str) -> StorageResult<()> {
        self.copy(path, new_path).await?;

        self.delete(path).await.map_err(|e| StorageError::RenameIncomplete {
            from: path.to_string(),
            to: new_path.to_string(),
            source: Box::new(e),
        })
    }

    async fn delete_dir(&self, dir: &str) -> StorageResult<()> {
        let dir_key = self.dir_key(dir);
        let mut entries = Vec::new();
        self.walk("delete_dir", dir_key, WalkMode::Descendants, true, &mut entries)
            .await?;

        let keys: Vec<String> = entries
            .iter()
            .map(|entry| match entry.kind {
                EntryKind::File => self.prefix.apply(&entry.path),
                EntryKind::Dir => format!("{}/", self.prefix.apply(&entry.path)),
            })
            .collect();

        if keys.is_empty() {
            tracing::debug!("OSS删除目录: {} 为空，跳过", dir);
            return Ok(());
        }

        tracing::debug!("OSS删除目录: {}, {} keys", dir, keys.len());
        self.client
            .delete_objects(&keys)
            .await
            .map_err(|e| self.map_err("delete_dir", dir, e))
    }

    async fn create_dir(&self, dir: &str, options: &WriteOptions) -> StorageResult<DirRecord> {
        let key = self.prefix.apply(dir);
        let options = self.options.merged_with(options);
        let put = PutOptions {
            content_type: options.mimetype,
        };
        self.client
            .create_object_dir(&key, &put)
            .await
            .map_err(|e| self.map_err("create_dir", dir, e))?;

        Ok(DirRecord { path: dir.to_string(), kind: EntryKind::Dir })
    }

    async fn has(&self, path: &str) -> StorageResult<bool> {
        let key = self.prefix.apply(path);
        self.client
            .does_object_exist(&key)
            .await
            .map_err(|e| self.map_err("has", path, e))
    }

    async fn list_contents(&self, dir: &str, recursive: bool) -> StorageResult<Vec<Entry>> {
        let mode = if recursive { WalkMode::Recursive } else { WalkMode::Shallow };
        let mut entries = Vec::new();
        self.walk("list_contents", self.dir_key(dir), mode, true, &mut entries)
            .await?;
        Ok(entries)
    }

    async fn get_metadata(&self, path: &str) -> StorageResult<Metadata> {
        let key = self.prefix.apply(path);
        let meta = self
            .client
            .get_object_meta(&key)
            .await
            .map_err(|e| self.map_err("get_metadata", path, e))?;

        Ok(Metadata {
            kind: EntryKind::File,
            dirname: dirname(path),
            path: path.to_string(),
            timestamp: meta.last_modified.map(|t| t.timestamp()).unwrap_or(0),
            mimetype: meta.content_type,
            size: meta.content_length,
        })
    }

    async fn get_url(&self, path: &str) -> StorageResult<String> {
        let key = self.prefix.apply(path);
        let meta = self
            .client
            .get_object_meta(&key)
            .await
            .map_err(|e| self.map_err("get_url", path, e))?;

        match &self.cname {
            Some(cname) => Self::replace_host(&meta.request_url, cname)
                .map_err(|e| self.map_err("get_url", path, e)),
            None => Ok(meta.request_url),
        }
    }

    async fn get_signed_download_url(
        &self,
        path: &str,
        expires: u64,
        host_override: Option<&str>,
        force_https: bool,
    ) -> StorageResult<String> {
        let key = self.prefix.apply(path);
        let url = self
            .client
            .sign_url(&key, expires)
            .map_err(|e| self.map_err("get_signed_download_url", path, e))?;

        let host = host_override.filter(|h| !h.is_empty());
        if host.is_none() && !force_https {
            return Ok(url);
        }

        let mut parsed = Url::parse(&url)
            .map_err(|e| self.map_err("get_signed_download_url", path, e.into()))?;
        if let Some(host) = host {
            parsed
                .set_host(Some(&format!("{}.{}", self.bucket(), host)))
                .map_err(|e| self.map_err("get_signed_download_url", path, e.into()))?;
        }
        if force_https {
            parsed.set_scheme("https").map_err(|_| {
                self.map_err(
                    "get_signed_download_url",
                    path,
                    OssError::InvalidResponse(format!("cannot switch {} to https", url)),
                )
            })?;
        }

        Ok(parsed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::oss::{MemoryOssClient, OssHttpClient};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn adapter(client: &MemoryOssClient, prefix: &str) -> OssAdapter {
        OssAdapter::new(Box::new(client.clone()), prefix)
    }

    fn paths(entries: &[Entry]) -> Vec<(EntryKind, &str)> {
        entries.iter().map(|e| (e.kind, e.path.as_str())).collect()
    }

    fn seed_tree(client: &MemoryOssClient) {
        client.insert("a.txt", Bytes::from_static(b"alpha"));
        client.insert("dir/", Bytes::new());
        client.insert("dir/b.txt", Bytes::from_static(b"beta"));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let client = MemoryOssClient::new("bucket").recording();
        let oss = adapter(&client, "uploads");

        let record = oss
            .write("notes/a.txt", Bytes::from_static(b"hello"), &WriteOptions::default())
            .await
            .unwrap();
        assert_eq!(record.kind, EntryKind::File);
        assert_eq!(record.path, "notes/a.txt");
        assert_eq!(record.mimetype, "text/plain");
        assert_eq!(record.size, 5);
        assert!(client.contains("uploads/notes/a.txt"));

        let read = oss.read("notes/a.txt").await.unwrap();
        assert_eq!(read.contents, Bytes::from_static(b"hello"));
        assert_eq!(read.path, "notes/a.txt");
    }

    #[tokio::test]
    async fn test_write_options_override_defaults() {
        let client = MemoryOssClient::new("bucket").recording();
        let oss = adapter(&client, "").with_options(WriteOptions::default().mimetype("application/pdf"));

        let record = oss
            .write("report.bin", Bytes::from_static(b"%PDF"), &WriteOptions::default().size(4096))
            .await
            .unwrap();
        assert_eq!(record.mimetype, "application/pdf");
        assert_eq!(record.size, 4096);

        let record = oss
            .update("report.bin", Bytes::from_static(b"{}"), &WriteOptions::default().mimetype("application/json"))
            .await
            .unwrap();
        assert_eq!(record.mimetype, "application/json");
        assert_eq!(record.size, 2);
        assert_eq!(oss.get_mimetype("report.bin").await.unwrap(), "application/json");
        assert_eq!(oss.read("report.bin").await.unwrap().contents, Bytes::from_static(b"{}"));
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let client = MemoryOssClient::new("bucket").recording();
        client.fail("put_object");
        let oss = adapter(&client, "");

        let err = oss
            .write("a.txt", Bytes::from_static(b"x"), &WriteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Backend { operation: "write", .. }));
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let client = MemoryOssClient::new("bucket").recording();
        let oss = adapter(&client, "");
        assert!(oss.read("missing.txt").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_copy_then_delete() {
        let client = MemoryOssClient::new("bucket").recording();
        client.insert("p.txt", Bytes::from_static(b"p"));
        let oss = adapter(&client, "");

        oss.copy("p.txt", "q.txt").await.unwrap();
        oss.delete("p.txt").await.unwrap();

        assert!(!oss.has("p.txt").await.unwrap());
        assert!(oss.has("q.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_moves_object() {
        let client = MemoryOssClient::new("bucket").recording();
        client.insert("docs/old.txt", Bytes::from_static(b"v1"));
        let oss = adapter(&client, "docs");

        oss.rename("old.txt", "new.txt").await.unwrap();
        assert_eq!(client.keys(), vec!["docs/new.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_rename_stops_when_copy_fails() {
        let client = MemoryOssClient::new("bucket").recording();
        client.insert("p.txt", Bytes::from_static(b"p"));
        client.fail("copy_object");
        let oss = adapter(&client, "");

        assert!(oss.rename("p.txt", "q.txt").await.is_err());
        assert!(oss.has("p.txt").await.unwrap());
        assert!(!oss.has("q.txt").await.unwrap());
        assert!(client.calls_of("delete_object").is_empty());
    }

    #[tokio::test]
    async fn test_rename_reports_failed_delete() {
        let client = MemoryOssClient::new("bucket").recording();
        client.insert("p.txt", Bytes::from_static(b"p"));
        client.fail("delete_object");
        let oss = adapter(&client, "");

        let err = oss.rename("p.txt", "q.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::RenameIncomplete { .. }));
        assert!(client.contains("p.txt"));
        assert!(client.contains("q.txt"));
    }

    #[tokio::test]
    async fn test_list_root_shallow() {
        let client = MemoryOssClient::new("bucket").recording();
        seed_tree(&client);
        let oss = adapter(&client, "");

        let entries = oss.list_contents("", false).await.unwrap();
        assert_eq!(paths(&entries), vec![(EntryKind::File, "a.txt"), (EntryKind::Dir, "dir")]);
        assert_eq!(entries[0].size, Some(5));
        assert_eq!(entries[1].timestamp, 0);
        assert_eq!(client.calls_of("list_objects").len(), 1);
    }

    #[tokio::test]
    async fn test_list_root_recursive() {
        let client = MemoryOssClient::new("bucket").recording();
        seed_tree(&client);
        let oss = adapter(&client, "");

        let entries = oss.list_contents("", true).await.unwrap();
        assert_eq!(
            paths(&entries),
            vec![(EntryKind::File, "a.txt"), (EntryKind::File, "dir/b.txt")]
        );
    }

    #[tokio::test]
    async fn test_list_directory_reports_its_marker() {
        let client = MemoryOssClient::new("bucket").recording();
        let modified = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        client.insert_at("dir/", Bytes::new(), modified);
        client.insert("dir/b.txt", Bytes::from_static(b"beta"));
        client.insert("dir2.txt", Bytes::from_static(b"sibling"));
        let oss = adapter(&client, "");

        let entries = oss.list_contents("dir", false).await.unwrap();
        assert_eq!(
            paths(&entries),
            vec![(EntryKind::Dir, "dir"), (EntryKind::File, "dir/b.txt")]
        );
        assert_eq!(entries[0].timestamp, modified.timestamp());
    }

    #[tokio::test]
    async fn test_list_strips_prefix() {
        let client = MemoryOssClient::new("bucket").recording();
        client.insert("site/index.html", Bytes::from_static(b"<html>"));
        client.insert("site/css/app.css", Bytes::from_static(b"body{}"));
        client.insert("other/secret.txt", Bytes::from_static(b"no"));
        let oss = adapter(&client, "site");

        let entries = oss.list_contents("", false).await.unwrap();
        assert_eq!(
            paths(&entries),
            vec![(EntryKind::File, "index.html"), (EntryKind::Dir, "css")]
        );

        let entries = oss.list_contents("/css/", true).await.unwrap();
        assert_eq!(paths(&entries), vec![(EntryKind::File, "css/app.css")]);
    }

    #[tokio::test]
    async fn test_list_follows_pages() {
        let client = MemoryOssClient::new("bucket").recording();
        for i in 0..2500 {
            client.insert(&format!("logs/{:05}.log", i), Bytes::from_static(b"l"));
        }
        let oss = adapter(&client, "");

        let entries = oss.list_contents("logs", false).await.unwrap();
        assert_eq!(entries.len(), 2500);
        assert_eq!(entries[0].path, "logs/00000.log");
        assert_eq!(entries[2499].path, "logs/02499.log");
        assert_eq!(client.calls_of("list_objects").len(), 3);
    }

    #[tokio::test]
    async fn test_list_failure_is_reported() {
        let client = MemoryOssClient::new("bucket").recording();
        seed_tree(&client);
        client.fail("list_objects");
        let oss = adapter(&client, "");

        let err = oss.list_contents("", true).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend { operation: "list_contents", .. }));
    }

    #[tokio::test]
    async fn test_delete_dir_single_batch() {
        let client = MemoryOssClient::new("bucket").recording();
        for key in [
            "d/x.txt",
            "d/y.txt",
            "d/s1/z.txt",
            "d/s1/deep/q.txt",
            "d/s2/w.txt",
            "d2.txt",
            "keep/k.txt",
        ] {
            client.insert(key, Bytes::from_static(b"data"));
        }
        client.insert("d/s2/", Bytes::new());
        let oss = adapter(&client, "");

        oss.delete_dir("d").await.unwrap();

        let batches = client.calls_of("delete_objects");
        assert_eq!(batches.len(), 1);
        let keys: BTreeSet<&str> = batches[0].keys.iter().map(|k| k.as_str()).collect();
        let expected: BTreeSet<&str> = [
            "d/x.txt",
            "d/y.txt",
            "d/s1/z.txt",
            "d/s1/deep/q.txt",
            "d/s2/w.txt",
            "d/s1/",
            "d/s1/deep/",
            "d/s2/",
        ]
        .into_iter()
        .collect();
        assert_eq!(keys, expected);
        assert_eq!(batches[0].keys.len(), 8);
        assert_eq!(client.keys(), vec!["d2.txt".to_string(), "keep/k.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_dir_with_prefix_and_own_marker() {
        let client = MemoryOssClient::new("bucket").recording();
        client.insert("app/tmp/", Bytes::new());
        client.insert("app/tmp/a.bin", Bytes::from_static(b"a"));
        let oss = adapter(&client, "app");

        oss.delete_dir("tmp").await.unwrap();

        let batches = client.calls_of("delete_objects");
        assert_eq!(batches[0].keys, vec!["app/tmp/".to_string(), "app/tmp/a.bin".to_string()]);
        assert!(client.keys().is_empty());
    }

    #[tokio::test]
    async fn test_delete_empty_dir_skips_batch() {
        let client = MemoryOssClient::new("bucket").recording();
        let oss = adapter(&client, "");

        oss.delete_dir("nothing").await.unwrap();
        assert!(client.calls_of("delete_objects").is_empty());
    }

    #[tokio::test]
    async fn test_delete_dir_batch_failure() {
        let client = MemoryOssClient::new("bucket").recording();
        client.insert("d/x.txt", Bytes::from_static(b"x"));
        client.fail("delete_objects");
        let oss = adapter(&client, "");

        let err = oss.delete_dir("d").await.unwrap_err();
        assert!(matches!(err, StorageError::Backend { operation: "delete_dir", .. }));
        assert!(client.contains("d/x.txt"));
    }

    #[tokio::test]
    async fn test_create_dir() {
        let client = MemoryOssClient::new("bucket").recording();
        let oss = adapter(&client, "uploads");

        let record = oss.create_dir("photos", &WriteOptions::default()).await.unwrap();
        assert_eq!(record, DirRecord { path: "photos".to_string(), kind: EntryKind::Dir });
        assert!(client.contains("uploads/photos/"));

        let entries = oss.list_contents("", false).await.unwrap();
        assert_eq!(paths(&entries), vec![(EntryKind::Dir, "photos")]);
    }

    #[tokio::test]
    async fn test_metadata_and_scalars() {
        let client = MemoryOssClient::new("bucket").recording();
        let oss = adapter(&client, "");
        oss.write("img/logo.png", Bytes::from_static(b"\x89PNG\r\n"), &WriteOptions::default())
            .await
            .unwrap();

        let meta = oss.get_metadata("img/logo.png").await.unwrap();
        assert_eq!(meta.kind, EntryKind::File);
        assert_eq!(meta.dirname, "img");
        assert_eq!(meta.path, "img/logo.png");
        assert_eq!(meta.mimetype, "image/png");
        assert_eq!(meta.size, 6);
        assert!(meta.timestamp > 0);

        assert_eq!(oss.get_size("img/logo.png").await.unwrap(), 6);
        assert_eq!(oss.get_timestamp("img/logo.png").await.unwrap(), meta.timestamp);
        assert!(oss.get_size("img/missing.png").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_has_reports_backend_errors() {
        let client = MemoryOssClient::new("bucket").recording();
        client.fail("does_object_exist");
        let oss = adapter(&client, "");
        assert!(matches!(
            oss.has("a.txt").await.unwrap_err(),
            StorageError::Backend { operation: "has", .. }
        ));
    }

    #[tokio::test]
    async fn test_get_url_without_cname() {
        let client = MemoryOssClient::with_endpoint("media", "http://oss-cn-hangzhou.aliyuncs.com").unwrap();
        client.insert("uploads/img/a.png", Bytes::from_static(b"png"));
        let oss = adapter(&client, "uploads");

        assert_eq!(
            oss.get_url("img/a.png").await.unwrap(),
            "http://media.oss-cn-hangzhou.aliyuncs.com/uploads/img/a.png"
        );
    }

    #[tokio::test]
    async fn test_get_url_with_cname_replaces_host_only() {
        let client = MemoryOssClient::with_endpoint("media", "https://oss-cn-hangzhou.aliyuncs.com").unwrap();
        client.insert("uploads/img/a b.png", Bytes::from_static(b"png"));
        let oss = adapter(&client, "uploads").with_cname(Some("cdn.example.com"));

        let backend = Url::parse(&client.get_object_meta("uploads/img/a b.png").await.unwrap().request_url).unwrap();
        let url = Url::parse(&oss.get_url("img/a b.png").await.unwrap()).unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
        assert_eq!(url.scheme(), backend.scheme());
        assert_eq!(url.path(), backend.path());
        assert_eq!(url.query(), backend.query());
    }

    #[tokio::test]
    async fn test_signed_url_force_https() {
        let client = MemoryOssClient::with_endpoint("media", "http://oss-cn-hangzhou.aliyuncs.com").unwrap();
        let oss = adapter(&client, "");

        let plain = Url::parse(&oss.get_signed_download_url("a.txt", 60, None, false).await.unwrap()).unwrap();
        assert_eq!(plain.scheme(), "http");

        let url = oss.get_signed_download_url("a.txt", 60, None, true).await.unwrap();
        let url = Url::parse(&url).unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), plain.host_str());
        assert_eq!(url.path(), plain.path());
        assert!(url.query_pairs().any(|(k, v)| k == "OSSAccessKeyId" && v == "memory"));
    }

    #[tokio::test]
    async fn test_signed_url_host_override() {
        let client = MemoryOssClient::with_endpoint("media", "http://oss-cn-hangzhou-internal.aliyuncs.com").unwrap();
        let oss = adapter(&client, "files");

        let url = oss
            .get_signed_download_url("a.txt", 3600, Some("oss-cn-hangzhou.aliyuncs.com"), false)
            .await
            .unwrap();
        let url = Url::parse(&url).unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("media.oss-cn-hangzhou.aliyuncs.com"));
        assert_eq!(url.path(), "/files/a.txt");
        assert!(url.query_pairs().any(|(k, _)| k == "Signature"));

        let empty_host = oss.get_signed_download_url("a.txt", 3600, Some(""), false).await.unwrap();
        assert!(empty_host.starts_with("http://media.oss-cn-hangzhou-internal.aliyuncs.com/"));
    }

    #[tokio::test]
    async fn test_signed_url_rejects_unrepresentable_expiry() {
        let client = MemoryOssClient::new("media");
        let memory = adapter(&client, "");
        let http = OssAdapter::new(
            Box::new(
                OssHttpClient::new("id", "secret", "oss-cn-hangzhou.aliyuncs.com", "media", true).unwrap(),
            ),
            "",
        );

        for oss in [&memory, &http] {
            for expires in [u64::MAX, u64::MAX / 2, i64::MAX as u64] {
                let err = oss
                    .get_signed_download_url("a.txt", expires, None, true)
                    .await
                    .unwrap_err();
                assert!(
                    matches!(err, StorageError::Backend { operation: "get_signed_download_url", .. }),
                    "{}: {}",
                    expires,
                    err
                );
            }
            assert!(oss.get_signed_download_url("a.txt", 3600, None, false).await.is_ok());
        }
    }
}
