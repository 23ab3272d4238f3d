//! In-memory OSS client / 内存OSS客户端
//!
//! Behaves like a single bucket: flat keys, delimiter listing with markers,
//! idempotent deletes. Any operation can be made to fail, and a client built
//! with [`MemoryOssClient::recording`] keeps a log of its calls.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use url::Url;

use super::client::{
    expiry_timestamp, ListObjectsPage, ListObjectsRequest, ObjectMeta, ObjectSummary, OssClient,
    OssError, OssResult, PutOptions,
};

const DEFAULT_ENDPOINT: &str = "https://oss-memory.local";

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// One recorded client call / 一次客户端调用记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCall {
    pub op: &'static str,
    pub keys: Vec<String>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<String, StoredObject>,
    recording: bool,
    calls: Vec<ClientCall>,
    failing: HashSet<&'static str>,
}

/// In-memory bucket; clones share the same state / 内存存储桶，克隆共享状态
#[derive(Clone)]
pub struct MemoryOssClient {
    bucket: String,
    endpoint: Url,
    state: Arc<Mutex<State>>,
}

enum Listed {
    Object(ObjectSummary),
    Prefix(String),
}

impl MemoryOssClient {
    pub fn new(bucket: &str) -> Self {
        Self::with_endpoint(bucket, DEFAULT_ENDPOINT).expect("default endpoint is a valid URL")
    }

    pub fn with_endpoint(bucket: &str, endpoint: &str) -> OssResult<Self> {
        Ok(Self {
            bucket: bucket.to_string(),
            endpoint: Url::parse(endpoint)?,
            state: Arc::new(Mutex::new(State::default())),
        })
    }

    /// Keep a log of every client call, shared by all clones / 记录所有客户端调用
    pub fn recording(self) -> Self {
        self.state.lock().recording = true;
        self
    }

    /// Seed an object without recording a call / 直接写入对象（不记录调用）
    pub fn insert(&self, key: &str, data: impl Into<Bytes>) {
        self.insert_at(key, data, Utc::now());
    }

    pub fn insert_at(&self, key: &str, data: impl Into<Bytes>, last_modified: DateTime<Utc>) {
        let object = StoredObject {
            data: data.into(),
            content_type: "application/octet-stream".to_string(),
            last_modified,
        };
        self.state.lock().objects.insert(key.to_string(), object);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().objects.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().objects.keys().cloned().collect()
    }

    /// Make every subsequent call of `op` fail / 让指定操作失败
    pub fn fail(&self, op: &'static str) {
        self.state.lock().failing.insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.state.lock().failing.remove(op);
    }

    pub fn calls(&self) -> Vec<ClientCall> {
        self.state.lock().calls.clone()
    }

    pub fn calls_of(&self, op: &str) -> Vec<ClientCall> {
        self.state.lock().calls.iter().filter(|c| c.op == op).cloned().collect()
    }

    fn record(&self, op: &'static str, keys: Vec<String>) -> OssResult<()> {
        let mut state = self.state.lock();
        if state.recording {
            state.calls.push(ClientCall { op, keys });
        }
        if state.failing.contains(op) {
            return Err(OssError::Injected(op));
        }
        Ok(())
    }

    fn object_url(&self, key: &str) -> OssResult<Url> {
        let host = self.endpoint.host_str().unwrap_or("localhost");
        let mut url = self.endpoint.clone();
        url.set_host(Some(&format!("{}.{}", self.bucket, host)))?;
        url.set_path(key);
        Ok(url)
    }
}

#[async_trait]
impl OssClient for MemoryOssClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(&self, key: &str, body: Bytes, options: &PutOptions) -> OssResult<()> {
        self.record("put_object", vec![key.to_string()])?;
        let object = StoredObject {
            data: body,
            content_type: options
                .content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            last_modified: Utc::now(),
        };
        self.state.lock().objects.insert(key.to_string(), object);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> OssResult<Bytes> {
        self.record("get_object", vec![key.to_string()])?;
        self.state
            .lock()
            .objects
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| OssError::NotFound { key: key.to_string() })
    }

    async fn get_object_meta(&self, key: &str) -> OssResult<ObjectMeta> {
        self.record("get_object_meta", vec![key.to_string()])?;
        let object = self
            .state
            .lock()
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| OssError::NotFound { key: key.to_string() })?;
        Ok(ObjectMeta {
            content_type: object.content_type,
            content_length: object.data.len() as u64,
            last_modified: Some(object.last_modified),
            request_url: self.object_url(key)?.to_string(),
        })
    }

    async fn does_object_exist(&self, key: &str) -> OssResult<bool> {
        self.record("does_object_exist", vec![key.to_string()])?;
        Ok(self.contains(key))
    }

    async fn copy_object(&self, from_key: &str, to_key: &str) -> OssResult<()> {
        self.record("copy_object", vec![from_key.to_string(), to_key.to_string()])?;
        let mut state = self.state.lock();
        let mut object = state
            .objects
            .get(from_key)
            .cloned()
            .ok_or_else(|| OssError::NotFound { key: from_key.to_string() })?;
        object.last_modified = Utc::now();
        state.objects.insert(to_key.to_string(), object);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> OssResult<()> {
        self.record("delete_object", vec![key.to_string()])?;
        self.state.lock().objects.remove(key);
        Ok(())
    }

    async fn delete_objects(&self, keys: &[String]) -> OssResult<()> {
        self.record("delete_objects", keys.to_vec())?;
        let mut state = self.state.lock();
        for key in keys {
            state.objects.remove(key);
        }
        Ok(())
    }

    async fn list_objects(&self, request: &ListObjectsRequest) -> OssResult<ListObjectsPage> {
        self.record("list_objects", vec![request.prefix.clone()])?;
        let state = self.state.lock();
        let prefix = request.prefix.as_str();
        let delimiter = request.delimiter.as_str();
        let marker = request.marker.as_str();
        // Marker pointing at a rolled-up prefix skips everything below it
        let marker_is_prefix = !delimiter.is_empty() && marker.ends_with(delimiter);

        let mut page = ListObjectsPage::default();
        let mut count: u32 = 0;
        let mut last_marker = String::new();

        for (key, object) in state.objects.iter() {
            if !marker.is_empty() && key.as_str() <= marker {
                continue;
            }
            if marker_is_prefix && key.starts_with(marker) {
                continue;
            }
            if !key.starts_with(prefix) {
                continue;
            }

            let rest = &key[prefix.len()..];
            let split = if delimiter.is_empty() { None } else { rest.find(delimiter) };
            let listed = match split {
                Some(idx) => {
                    let common = format!("{}{}", prefix, &rest[..idx + delimiter.len()]);
                    if page.common_prefixes.last() == Some(&common) {
                        continue;
                    }
                    Listed::Prefix(common)
                }
                None => Listed::Object(ObjectSummary {
                    key: key.clone(),
                    size: object.data.len() as u64,
                    last_modified: Some(object.last_modified),
                }),
            };

            if count == request.max_keys {
                page.is_truncated = true;
                break;
            }
            count += 1;

            match listed {
                Listed::Object(summary) => {
                    last_marker = summary.key.clone();
                    page.objects.push(summary);
                }
                Listed::Prefix(common) => {
                    last_marker = common.clone();
                    page.common_prefixes.push(common);
                }
            }
        }

        if page.is_truncated {
            page.next_marker = Some(last_marker);
        }
        Ok(page)
    }

    async fn create_object_dir(&self, key: &str, _options: &PutOptions) -> OssResult<()> {
        let marker = format!("{}/", key.trim_end_matches('/'));
        self.record("create_object_dir", vec![marker.clone()])?;
        self.insert(&marker, Bytes::new());
        Ok(())
    }

    fn sign_url(&self, key: &str, expires: u64) -> OssResult<String> {
        self.record("sign_url", vec![key.to_string()])?;
        let expires_at = expiry_timestamp(Utc::now().timestamp(), expires)?;
        let mut url = self.object_url(key)?;
        url.query_pairs_mut()
            .append_pair("OSSAccessKeyId", "memory")
            .append_pair("Expires", &expires_at.to_string())
            .append_pair("Signature", "memory");
        Ok(url.to_string())
    }
}
