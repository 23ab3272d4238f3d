//! Aliyun OSS REST client / 阿里云OSS REST客户端
//!
//! Virtual-hosted addressing (`bucket.endpoint`) with the V1 header signature:
//! `Authorization: OSS <AccessKeyId>:<base64(hmac-sha1(secret, StringToSign))>`
//! StringToSign = VERB + "\n" + Content-MD5 + "\n" + Content-Type + "\n" + Date + "\n"
//!              + CanonicalizedOSSHeaders + CanonicalizedResource

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use sha1::Sha1;
use url::Url;

use super::client::{
    expiry_timestamp, ListObjectsPage, ListObjectsRequest, ObjectMeta, ObjectSummary, OssClient,
    OssError, OssResult, PutOptions,
};

type HmacSha1 = Hmac<Sha1>;

const OSS_USER_AGENT: &str = concat!("oss-disk/", env!("CARGO_PKG_VERSION"));
const OSS_COPY_SOURCE_HEADER: &str = "x-oss-copy-source";
/// OSS rejects batch deletes with more keys than this / 单次批量删除上限
const DELETE_BATCH_LIMIT: usize = 1000;

/// Error body returned by OSS / OSS错误响应
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorXml {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResultXml {
    #[serde(default)]
    is_truncated: bool,
    #[serde(default)]
    next_marker: Option<String>,
    #[serde(default)]
    contents: Vec<ContentsXml>,
    #[serde(default)]
    common_prefixes: Vec<CommonPrefixXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContentsXml {
    key: String,
    #[serde(default)]
    last_modified: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CommonPrefixXml {
    prefix: String,
}

/// HTTP client for one bucket / 单个存储桶的HTTP客户端
pub struct OssHttpClient {
    client: Client,
    access_key_id: String,
    access_key_secret: String,
    bucket: String,
    /// Endpoint with scheme, e.g. `https://oss-cn-hangzhou.aliyuncs.com` / 带协议的端点
    endpoint: Url,
}

impl OssHttpClient {
    /// `endpoint` may omit the scheme; `use_https` decides it then / 端点可省略协议
    pub fn new(
        access_key_id: &str,
        access_key_secret: &str,
        endpoint: &str,
        bucket: &str,
        use_https: bool,
    ) -> OssResult<Self> {
        let endpoint = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            let scheme = if use_https { "https" } else { "http" };
            format!("{}://{}", scheme, endpoint)
        };
        let endpoint = Url::parse(&endpoint)?;
        if endpoint.host_str().is_none() {
            return Err(OssError::Url(url::ParseError::EmptyHost));
        }

        let client = Client::builder().user_agent(OSS_USER_AGENT).build()?;

        Ok(Self {
            client,
            access_key_id: access_key_id.to_string(),
            access_key_secret: access_key_secret.to_string(),
            bucket: bucket.to_string(),
            endpoint,
        })
    }

    /// Bucket URL for an object key / 对象URL
    fn object_url(&self, key: &str) -> OssResult<Url> {
        let host = self.endpoint.host_str().unwrap_or_default();
        let mut url = self.endpoint.clone();
        url.set_host(Some(&format!("{}.{}", self.bucket, host)))?;
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        url.set_path(&encoded.join("/"));
        Ok(url)
    }

    /// Canonicalized resource: `/bucket/key` plus sub-resource / 规范化资源
    fn canonical_resource(&self, key: &str, sub_resource: Option<&str>) -> String {
        match sub_resource {
            Some(sub) => format!("/{}/{}?{}", self.bucket, key, sub),
            None => format!("/{}/{}", self.bucket, key),
        }
    }

    /// Generate OSS signature / 生成OSS签名
    fn sign(
        &self,
        verb: &str,
        content_md5: &str,
        content_type: &str,
        date: &str,
        oss_headers: &[(&str, &str)],
        resource: &str,
    ) -> String {
        let mut headers: Vec<(String, &str)> = oss_headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), *v))
            .collect();
        headers.sort();
        let canonicalized_oss_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}\n{}{}",
            verb, content_md5, content_type, date, canonicalized_oss_headers, resource
        );

        let mut mac = HmacSha1::new_from_slice(self.access_key_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(string_to_sign.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    /// Get GMT date string / 获取GMT日期字符串
    fn gmt_date() -> String {
        Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
    }

    fn signed_url_at(&self, key: &str, expires_at: i64) -> OssResult<String> {
        let expires = expires_at.to_string();
        let resource = self.canonical_resource(key, None);
        let signature = self.sign("GET", "", "", &expires, &[], &resource);

        let mut url = self.object_url(key)?;
        url.query_pairs_mut()
            .append_pair("OSSAccessKeyId", &self.access_key_id)
            .append_pair("Expires", &expires)
            .append_pair("Signature", &signature);
        Ok(url.to_string())
    }

    /// Build and send one signed request / 发送签名请求
    #[allow(clippy::too_many_arguments)]
    async fn send(
        &self,
        method: Method,
        url: Url,
        resource: &str,
        body: Option<Bytes>,
        content_type: &str,
        content_md5: &str,
        oss_headers: &[(&str, &str)],
    ) -> OssResult<Response> {
        let date = Self::gmt_date();
        let signature = self.sign(
            method.as_str(),
            content_md5,
            content_type,
            &date,
            oss_headers,
            resource,
        );
        let auth = format!("OSS {}:{}", self.access_key_id, signature);

        tracing::debug!("OSS {} {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .header("Date", &date)
            .header("Authorization", &auth);
        if !content_type.is_empty() {
            request = request.header("Content-Type", content_type);
        }
        if !content_md5.is_empty() {
            request = request.header("Content-MD5", content_md5);
        }
        for (name, value) in oss_headers {
            request = request.header(*name, *value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        Ok(request.send().await?)
    }

    /// Map a non-2xx response to an error / 将非2xx响应转换为错误
    async fn check(resp: Response, key: &str) -> OssResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(OssError::NotFound { key: key.to_string() });
        }

        let text = resp.text().await.unwrap_or_default();
        let error: ErrorXml = quick_xml::de::from_str(&text).unwrap_or_default();
        if status == StatusCode::FORBIDDEN {
            return Err(OssError::AccessDenied {
                message: format!("{} {}", error.code, error.message).trim().to_string(),
            });
        }
        Err(OssError::Status {
            status: status.as_u16(),
            code: error.code,
            message: error.message,
        })
    }

    async fn head(&self, key: &str) -> OssResult<(Url, Response)> {
        let url = self.object_url(key)?;
        let resource = self.canonical_resource(key, None);
        let resp = self
            .send(Method::HEAD, url.clone(), &resource, None, "", "", &[])
            .await?;
        Ok((url, Self::check(resp, key).await?))
    }
}

/// Parse a ListBucketResult document / 解析列举结果
fn parse_list_result(xml: &str) -> OssResult<ListObjectsPage> {
    let result: ListBucketResultXml = quick_xml::de::from_str(xml)?;
    let objects = result
        .contents
        .into_iter()
        .map(|c| ObjectSummary {
            key: c.key,
            size: c.size,
            last_modified: DateTime::parse_from_rfc3339(&c.last_modified)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
        })
        .collect();
    Ok(ListObjectsPage {
        objects,
        common_prefixes: result.common_prefixes.into_iter().map(|p| p.prefix).collect(),
        is_truncated: result.is_truncated,
        next_marker: result.next_marker.filter(|m| !m.is_empty()),
    })
}

/// Quiet multi-delete request body / 批量删除请求体
fn delete_body(keys: &[String]) -> String {
    let mut body = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Delete><Quiet>true</Quiet>"#);
    for key in keys {
        body.push_str("<Object><Key>");
        body.push_str(&quick_xml::escape::escape(key.as_str()));
        body.push_str("</Key></Object>");
    }
    body.push_str("</Delete>");
    body
}

fn header_str<'a>(resp: &'a Response, name: &str) -> Option<&'a str> {
    resp.headers().get(name).and_then(|v| v.to_str().ok())
}

#[async_trait]
impl OssClient for OssHttpClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(&self, key: &str, body: Bytes, options: &PutOptions) -> OssResult<()> {
        let url = self.object_url(key)?;
        let resource = self.canonical_resource(key, None);
        let content_type = options
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");
        let resp = self
            .send(Method::PUT, url, &resource, Some(body), content_type, "", &[])
            .await?;
        Self::check(resp, key).await?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> OssResult<Bytes> {
        let url = self.object_url(key)?;
        let resource = self.canonical_resource(key, None);
        let resp = self.send(Method::GET, url, &resource, None, "", "", &[]).await?;
        let resp = Self::check(resp, key).await?;
        Ok(resp.bytes().await?)
    }

    async fn get_object_meta(&self, key: &str) -> OssResult<ObjectMeta> {
        let (url, resp) = self.head(key).await?;
        Ok(ObjectMeta {
            content_type: header_str(&resp, "content-type")
                .unwrap_or("application/octet-stream")
                .to_string(),
            content_length: header_str(&resp, "content-length")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            last_modified: header_str(&resp, "last-modified")
                .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
                .map(|t| t.with_timezone(&Utc)),
            request_url: url.to_string(),
        })
    }

    async fn does_object_exist(&self, key: &str) -> OssResult<bool> {
        match self.head(key).await {
            Ok(_) => Ok(true),
            Err(OssError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn copy_object(&self, from_key: &str, to_key: &str) -> OssResult<()> {
        let url = self.object_url(to_key)?;
        let resource = self.canonical_resource(to_key, None);
        let source = format!("/{}/{}", self.bucket, urlencoding::encode(from_key));
        let headers = [(OSS_COPY_SOURCE_HEADER, source.as_str())];
        let resp = self
            .send(Method::PUT, url, &resource, None, "", "", &headers)
            .await?;
        Self::check(resp, from_key).await?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> OssResult<()> {
        let url = self.object_url(key)?;
        let resource = self.canonical_resource(key, None);
        let resp = self.send(Method::DELETE, url, &resource, None, "", "", &[]).await?;
        Self::check(resp, key).await?;
        Ok(())
    }

    async fn delete_objects(&self, keys: &[String]) -> OssResult<()> {
        for chunk in keys.chunks(DELETE_BATCH_LIMIT) {
            let body = delete_body(chunk);
            let content_md5 = BASE64.encode(md5::compute(body.as_bytes()).0);
            let mut url = self.object_url("")?;
            url.set_query(Some("delete"));
            let resource = self.canonical_resource("", Some("delete"));

            tracing::debug!("OSS batch delete: {} keys", chunk.len());

            let resp = self
                .send(
                    Method::POST,
                    url,
                    &resource,
                    Some(Bytes::from(body)),
                    "application/xml",
                    &content_md5,
                    &[],
                )
                .await?;
            Self::check(resp, "").await?;
        }
        Ok(())
    }

    async fn list_objects(&self, request: &ListObjectsRequest) -> OssResult<ListObjectsPage> {
        let mut url = self.object_url("")?;
        url.query_pairs_mut()
            .append_pair("prefix", &request.prefix)
            .append_pair("delimiter", &request.delimiter)
            .append_pair("marker", &request.marker)
            .append_pair("max-keys", &request.max_keys.to_string());
        let resource = self.canonical_resource("", None);

        let resp = self.send(Method::GET, url, &resource, None, "", "", &[]).await?;
        let resp = Self::check(resp, &request.prefix).await?;
        let text = resp.text().await?;
        parse_list_result(&text)
    }

    async fn create_object_dir(&self, key: &str, options: &PutOptions) -> OssResult<()> {
        let marker = format!("{}/", key.trim_end_matches('/'));
        self.put_object(&marker, Bytes::new(), options).await
    }

    fn sign_url(&self, key: &str, expires: u64) -> OssResult<String> {
        let expires_at = expiry_timestamp(Utc::now().timestamp(), expires)?;
        self.signed_url_at(key, expires_at)
    }
}
