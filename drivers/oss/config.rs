//! OSS驱动配置 / OSS driver configuration

use serde::{Deserialize, Serialize};

use crate::storage::{StorageError, WriteOptions};

/// OSS配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OssConfig {
    /// Access Key ID
    #[serde(default)]
    pub access_id: String,
    /// Access Key Secret
    #[serde(default)]
    pub access_key: String,
    /// 端点地址，如 oss-cn-hangzhou.aliyuncs.com
    #[serde(default)]
    pub endpoint: String,
    /// 内网端点（ECS同地域访问）
    #[serde(default)]
    pub endpoint_internal: String,
    /// 使用内网端点
    #[serde(default)]
    pub internal: bool,
    /// 端点未带协议时使用HTTPS
    #[serde(default)]
    pub https: bool,
    /// 自定义域名（URL中替换主机名）
    #[serde(default)]
    pub cname: String,
    /// 存储桶名称
    #[serde(default)]
    pub bucket: String,
    /// 对象键前缀
    #[serde(default)]
    pub object_prefix: String,
    /// 每次写入合并的固定选项
    #[serde(default)]
    pub options: WriteOptions,
}

impl OssConfig {
    /// Read the `OSS_*` environment variables / 读取环境变量
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).unwrap_or_default();
        let flag = |name: &str| {
            lookup(name)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false)
        };

        Self {
            access_id: var("OSS_ACCESS_ID"),
            access_key: var("OSS_ACCESS_KEY"),
            endpoint: var("OSS_ENDPOINT"),
            endpoint_internal: var("OSS_ENDPOINT_INTERNAL"),
            internal: flag("OSS_INTERNAL"),
            https: flag("OSS_ENABLE_HTTPS"),
            cname: var("OSS_CNAME"),
            bucket: var("OSS_BUCKET"),
            object_prefix: var("OSS_OBJECT_PREFIX"),
            options: WriteOptions::default(),
        }
    }

    /// Endpoint actually used for requests / 实际使用的端点
    pub fn effective_endpoint(&self) -> &str {
        if self.internal && !self.endpoint_internal.is_empty() {
            &self.endpoint_internal
        } else {
            &self.endpoint
        }
    }

    pub fn cname(&self) -> Option<&str> {
        let cname = self.cname.trim();
        if cname.is_empty() {
            None
        } else {
            Some(cname)
        }
    }

    /// Check the required fields / 校验必填项
    pub fn validate(&self) -> Result<(), StorageError> {
        let missing: Vec<&str> = [
            ("access_id", self.access_id.as_str()),
            ("access_key", self.access_key.as_str()),
            ("endpoint", self.effective_endpoint()),
            ("bucket", self.bucket.as_str()),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(StorageError::Config(format!(
                "missing required OSS settings: {}",
                missing.join(", ")
            )))
        }
    }
}
