use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use anyhow::{anyhow, Result};
use serde_json::Value;

use super::{Filesystem, FilesystemAdapter};

pub type DriverBox = Arc<dyn FilesystemAdapter>;

/// Driver factory trait / 驱动工厂 trait
pub trait DriverFactory: Send + Sync {
    /// Driver type name / 驱动类型名称
    fn driver_type(&self) -> &'static str;

    /// 创建驱动实例
    fn create_driver(&self, config: Value) -> Result<Box<dyn FilesystemAdapter>>;
}

/// A named disk; the driver is built on first use / 已挂载的磁盘（首次使用时创建驱动）
struct MountedDisk {
    driver_type: String,
    config: Value,
    filesystem: OnceCell<Filesystem>,
}

/// Storage manager (factories and named disks) / 存储管理器
#[derive(Clone)]
pub struct StorageManager {
    factories: Arc<RwLock<HashMap<String, Arc<Box<dyn DriverFactory>>>>>,
    disks: Arc<RwLock<HashMap<String, Arc<MountedDisk>>>>,
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageManager {
    pub fn new() -> Self {
        Self {
            factories: Arc::new(RwLock::new(HashMap::new())),
            disks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register driver factory / 注册驱动工厂
    pub async fn register_factory(&self, factory: Box<dyn DriverFactory>) -> Result<()> {
        let driver_type = factory.driver_type().to_string();
        let factory_box = Arc::new(factory);

        let mut factories = self.factories.write().await;
        factories.insert(driver_type.clone(), factory_box);

        tracing::info!("Driver factory registered: {}", driver_type);
        Ok(())
    }

    /// Mount a disk without building its driver / 挂载磁盘（不立即创建驱动）
    ///
    /// Mounting an existing name replaces it; already resolved handles keep
    /// the old driver.
    pub async fn mount(&self, name: &str, driver_type: &str, config: Value) -> Result<()> {
        if !self.factories.read().await.contains_key(driver_type) {
            return Err(anyhow!("Driver type not found: {}", driver_type));
        }

        let disk = Arc::new(MountedDisk {
            driver_type: driver_type.to_string(),
            config,
            filesystem: OnceCell::new(),
        });
        self.disks.write().await.insert(name.to_string(), disk);

        tracing::info!("Disk mounted: {} ({})", name, driver_type);
        Ok(())
    }

    /// Remove a mounted disk / 卸载磁盘
    pub async fn unmount(&self, name: &str) -> Result<()> {
        let mut disks = self.disks.write().await;
        disks.remove(name)
            .ok_or_else(|| anyhow!("Disk not found: {}", name))?;

        tracing::info!("Disk unmounted: {}", name);
        Ok(())
    }

    /// Get a disk, building its driver on first use / 获取磁盘（首次使用时创建驱动）
    ///
    /// Concurrent first calls build the driver once. A failed build is returned
    /// to the caller and the next call tries again.
    pub async fn disk(&self, name: &str) -> Result<Filesystem> {
        let disk = self.disks.read().await.get(name).cloned()
            .ok_or_else(|| anyhow!("Disk not found: {}", name))?;

        let filesystem = disk.filesystem.get_or_try_init(|| self.build(name, &disk)).await?;
        Ok(filesystem.clone())
    }

    async fn build(&self, name: &str, disk: &MountedDisk) -> Result<Filesystem> {
        let factory = self.factories.read().await.get(&disk.driver_type).cloned()
            .ok_or_else(|| anyhow!("Driver type not found: {}", disk.driver_type))?;

        match factory.create_driver(disk.config.clone()) {
            Ok(driver) => {
                tracing::info!("Driver created: {} ({})", name, disk.driver_type);
                Ok(Filesystem::new(Arc::from(driver)))
            }
            Err(e) => {
                tracing::error!("Driver creation failed: {} ({}) - {:#}", name, disk.driver_type, e);
                Err(e)
            }
        }
    }

    /// Whether a disk's driver has been built / 磁盘驱动是否已创建
    pub async fn is_initialized(&self, name: &str) -> bool {
        let disks = self.disks.read().await;
        disks.get(name).map(|d| d.filesystem.initialized()).unwrap_or(false)
    }

    /// List all mounted disks / 列出所有已挂载磁盘
    pub async fn list_disks(&self) -> Vec<String> {
        let disks = self.disks.read().await;
        let mut names: Vec<String> = disks.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all available driver types / 列出所有可用的驱动类型
    pub async fn list_driver_types(&self) -> Vec<String> {
        let factories = self.factories.read().await;
        let mut types: Vec<String> = factories.keys().cloned().collect();
        types.sort();
        types
    }
}
