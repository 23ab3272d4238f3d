//! OSS驱动工厂

use anyhow::{Context, Result};
use serde_json::Value;

use super::adapter::OssAdapter;
use super::config::OssConfig;
use super::http::OssHttpClient;
use super::memory::MemoryOssClient;
use crate::storage::{DriverFactory, FilesystemAdapter};

/// A missing options block means all defaults / 未提供配置时使用默认值
fn parse_config(config: Value) -> Result<OssConfig> {
    if config.is_null() {
        return Ok(OssConfig::default());
    }
    serde_json::from_value(config).context("invalid OSS config")
}

/// OSS驱动工厂
pub struct OssDriverFactory;

impl DriverFactory for OssDriverFactory {
    fn driver_type(&self) -> &'static str {
        "oss"
    }

    fn create_driver(&self, config: Value) -> Result<Box<dyn FilesystemAdapter>> {
        let config = parse_config(config)?;
        config.validate()?;

        let client = OssHttpClient::new(
            &config.access_id,
            &config.access_key,
            config.effective_endpoint(),
            &config.bucket,
            config.https,
        )
        .context("failed to build OSS client")?;

        tracing::info!(
            "OSS disk configured: bucket={}, endpoint={}, prefix={:?}",
            config.bucket,
            config.effective_endpoint(),
            config.object_prefix
        );

        let adapter = OssAdapter::new(Box::new(client), &config.object_prefix)
            .with_cname(config.cname())
            .with_options(config.options.clone());
        Ok(Box::new(adapter))
    }
}

/// 内存OSS驱动工厂（数据不落盘，进程退出即丢失）
pub struct MemoryOssDriverFactory;

impl MemoryOssDriverFactory {
    /// Client and adapter for one disk; the client keeps no call log
    fn build(config: Value) -> Result<(MemoryOssClient, OssAdapter)> {
        let mut config = parse_config(config)?;
        if config.bucket.is_empty() {
            config.bucket = "memory".to_string();
        }

        let client = if config.endpoint.is_empty() {
            MemoryOssClient::new(&config.bucket)
        } else {
            MemoryOssClient::with_endpoint(&config.bucket, &config.endpoint)
                .context("invalid memory endpoint")?
        };

        let adapter = OssAdapter::new(Box::new(client.clone()), &config.object_prefix)
            .with_cname(config.cname())
            .with_options(config.options.clone());
        Ok((client, adapter))
    }
}

impl DriverFactory for MemoryOssDriverFactory {
    fn driver_type(&self) -> &'static str {
        "oss_memory"
    }

    fn create_driver(&self, config: Value) -> Result<Box<dyn FilesystemAdapter>> {
        let (_, adapter) = Self::build(config)?;
        Ok(Box::new(adapter))
    }
}
