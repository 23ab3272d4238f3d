//! Application configuration module / 应用配置模块
//!
//! Disks are read from config.json. Without a config file a single `oss`
//! disk is built from the `OSS_*` environment variables.
//! 没有配置文件时，从 `OSS_*` 环境变量构建默认的 `oss` 磁盘。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::drivers::oss::OssConfig;

/// Default disk name / 默认磁盘名称
pub const DEFAULT_DISK: &str = "oss";

/// Application configuration / 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Disk used when none is named / 默认磁盘
    #[serde(default = "default_disk")]
    pub default: String,
    /// Mounted disks by name / 磁盘列表
    #[serde(default)]
    pub disks: BTreeMap<String, DiskConfig>,
}

/// One disk: driver type plus driver options / 单个磁盘配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskConfig {
    pub driver: String,
    #[serde(default)]
    pub options: Value,
}

fn default_disk() -> String {
    DEFAULT_DISK.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_oss(OssConfig::default())
    }
}

impl AppConfig {
    /// Single `oss` disk with the given settings / 使用给定OSS配置的单磁盘配置
    pub fn from_oss(oss: OssConfig) -> Self {
        let mut disks = BTreeMap::new();
        disks.insert(
            DEFAULT_DISK.to_string(),
            DiskConfig {
                driver: "oss".to_string(),
                options: serde_json::to_value(oss).unwrap_or(Value::Null),
            },
        );
        Self { default: default_disk(), disks }
    }

    pub fn from_env() -> Self {
        Self::from_oss(OssConfig::from_env())
    }
}

/// Get the config file path / 获取配置文件路径
pub fn default_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, falling back to the environment / 加载配置文件，不存在则读取环境变量
pub fn load_config(path: &Path) -> Result<AppConfig, String> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    } else {
        tracing::info!("No config file at {:?}, using OSS_* environment variables", path);
        Ok(AppConfig::from_env())
    }
}
