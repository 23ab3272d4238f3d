//! Path processing utility functions / 路径处理工具函数

use crate::storage::StorageError;

/// Normalize a caller path into adapter form / 将调用方路径规范化为适配器路径
/// 1. Replace backslashes with forward slashes / 将反斜杠替换为正斜杠
/// 2. Drop empty and `.` segments / 去掉空段和 `.`
/// 3. Resolve `..`, refusing to climb above the root / 处理 `..`，不允许越过根目录
///
/// The result has no leading or trailing slash; the root is `""`.
pub fn normalize_path(path: &str) -> Result<String, StorageError> {
    let path = path.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                if parts.pop().is_none() {
                    return Err(StorageError::InvalidPath(format!(
                        "path is outside of the root directory: {}",
                        path
                    )));
                }
            }
            _ => parts.push(part),
        }
    }

    Ok(parts.join("/"))
}

/// Parent directory of a normalized path, `""` for top-level entries / 获取父目录
pub fn dirname(path: &str) -> String {
    match path.trim_end_matches('/').rfind('/') {
        Some(pos) => path[..pos].to_string(),
        None => String::new(),
    }
}

/// Guess mimetype from the file extension, then from the contents / 推断MIME类型
pub fn guess_mimetype(path: &str, contents: &[u8]) -> String {
    if let Some(mime) = mime_guess::from_path(path).first() {
        return mime.essence_str().to_string();
    }

    if std::str::from_utf8(contents).is_ok() {
        "text/plain".to_string()
    } else {
        "application/octet-stream".to_string()
    }
}

/// Object key prefix transform / 对象键前缀转换
///
/// The prefix is stored with exactly one trailing slash, an empty prefix
/// stays empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathPrefix {
    prefix: String,
}

impl PathPrefix {
    pub fn new(prefix: &str) -> Self {
        let trimmed = prefix.trim_end_matches(['/', '\\']);
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}/", trimmed)
        };
        Self { prefix }
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// Logical path -> object key / 路径转对象键
    pub fn apply(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path.trim_start_matches(['/', '\\']))
    }

    /// Object key -> logical path / 对象键转路径
    pub fn strip<'a>(&self, key: &'a str) -> &'a str {
        key.strip_prefix(self.prefix.as_str()).unwrap_or(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("").unwrap(), "");
        assert_eq!(normalize_path("/").unwrap(), "");
        assert_eq!(normalize_path(".").unwrap(), "");
        assert_eq!(normalize_path("a/b/c").unwrap(), "a/b/c");
        assert_eq!(normalize_path("/a/b/c/").unwrap(), "a/b/c");
        assert_eq!(normalize_path("a\\b\\c").unwrap(), "a/b/c");
        assert_eq!(normalize_path("/a//b///c").unwrap(), "a/b/c");
        assert_eq!(normalize_path("/a/./b/../c").unwrap(), "a/c");
        assert!(normalize_path("..").is_err());
        assert!(normalize_path("a/../../b").is_err());
    }

    #[test]
    fn test_dirname() {
        assert_eq!(dirname("a.txt"), "");
        assert_eq!(dirname("docs/a.txt"), "docs");
        assert_eq!(dirname("docs/2024/a.txt"), "docs/2024");
    }

    #[test]
    fn test_guess_mimetype() {
        assert_eq!(guess_mimetype("photo.png", b"\x89PNG"), "image/png");
        assert_eq!(guess_mimetype("notes", b"hello"), "text/plain");
        assert_eq!(guess_mimetype("blob", &[0xff, 0xfe, 0x00, 0x81]), "application/octet-stream");
    }

    #[test]
    fn test_path_prefix_normalization() {
        assert_eq!(PathPrefix::new("").as_str(), "");
        assert_eq!(PathPrefix::new("/").as_str(), "");
        assert_eq!(PathPrefix::new("uploads").as_str(), "uploads/");
        assert_eq!(PathPrefix::new("uploads//").as_str(), "uploads/");
    }

    #[test]
    fn test_path_prefix_round_trip() {
        for prefix in ["", "uploads", "tenant/a/"] {
            let p = PathPrefix::new(prefix);
            for path in ["a.txt", "dir/b.txt", "dir/", "deep/er/c.bin", ""] {
                let key = p.apply(path);
                assert_eq!(p.strip(&key), path, "prefix={:?} path={:?}", prefix, path);
            }
        }
    }

    #[test]
    fn test_path_prefix_applied_once() {
        let p = PathPrefix::new("uploads");
        assert_eq!(p.apply("dir/b.txt"), "uploads/dir/b.txt");
        assert_eq!(p.apply("/dir/b.txt"), "uploads/dir/b.txt");
        assert_eq!(p.strip("other/x"), "other/x");
    }
}
