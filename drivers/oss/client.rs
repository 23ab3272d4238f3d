//! OSS client capability set / OSS客户端能力集
//!
//! The adapter only talks to the backend through [`OssClient`]. Keys passed to
//! a client are full object keys (prefix already applied).

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Backend client error / 后端客户端错误
#[derive(Debug, Error)]
pub enum OssError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("access denied: {message}")]
    AccessDenied { message: String },

    #[error("OSS returned {status}: {code} {message}")]
    Status { status: u16, code: String, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid XML response: {0}")]
    Xml(#[from] quick_xml::de::DeError),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("expiry of {0} seconds is out of range")]
    ExpiryOutOfRange(u64),

    /// Failure injected by the in-memory client / 内存客户端注入的故障
    #[error("injected failure in {0}")]
    Injected(&'static str),
}

pub type OssResult<T> = std::result::Result<T, OssError>;

/// Unix time `expires` seconds after `now` / 计算签名URL的过期时间戳
pub fn expiry_timestamp(now: i64, expires: u64) -> OssResult<i64> {
    i64::try_from(expires)
        .ok()
        .and_then(|secs| now.checked_add(secs))
        .ok_or(OssError::ExpiryOutOfRange(expires))
}

/// Headers applied to a put request / 上传请求头
///
/// Content-Length always comes from the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: Option<String>,
}

/// Object metadata from a HEAD request / HEAD请求返回的对象元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub content_type: String,
    pub content_length: u64,
    pub last_modified: Option<DateTime<Utc>>,
    /// URL the metadata request was sent to / 元数据请求的URL
    pub request_url: String,
}

/// List objects request / 列举对象请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListObjectsRequest {
    pub prefix: String,
    pub delimiter: String,
    pub marker: String,
    pub max_keys: u32,
}

impl ListObjectsRequest {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            delimiter: "/".to_string(),
            marker: String::new(),
            max_keys: 1000,
        }
    }

    pub fn marker(mut self, marker: &str) -> Self {
        self.marker = marker.to_string();
        self
    }

    pub fn max_keys(mut self, max_keys: u32) -> Self {
        self.max_keys = max_keys;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a listing / 列举结果的一页
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsPage {
    pub objects: Vec<ObjectSummary>,
    /// Common prefixes ("virtual directories"), each ending with the delimiter / 公共前缀
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
    pub next_marker: Option<String>,
}

/// Object storage client interface / 对象存储客户端接口
#[async_trait]
pub trait OssClient: Send + Sync {
    fn bucket(&self) -> &str;

    async fn put_object(&self, key: &str, body: Bytes, options: &PutOptions) -> OssResult<()>;

    async fn get_object(&self, key: &str) -> OssResult<Bytes>;

    async fn get_object_meta(&self, key: &str) -> OssResult<ObjectMeta>;

    async fn does_object_exist(&self, key: &str) -> OssResult<bool>;

    async fn copy_object(&self, from_key: &str, to_key: &str) -> OssResult<()>;

    async fn delete_object(&self, key: &str) -> OssResult<()>;

    async fn delete_objects(&self, keys: &[String]) -> OssResult<()>;

    async fn list_objects(&self, request: &ListObjectsRequest) -> OssResult<ListObjectsPage>;

    /// Create the zero-byte `key/` directory marker / 创建目录占位对象
    async fn create_object_dir(&self, key: &str, options: &PutOptions) -> OssResult<()>;

    /// Presigned GET URL valid for `expires` seconds / 生成预签名URL
    fn sign_url(&self, key: &str, expires: u64) -> OssResult<String>;
}
