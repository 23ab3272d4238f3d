pub mod cli;
pub mod config;
pub mod utils;
pub mod storage;

// Driver modules (point to project root drivers via path attribute) / 驱动模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

// Register all storage drivers (call unified registration function from drivers module) / 注册所有存储驱动
pub async fn register_storage_drivers(manager: &storage::StorageManager) -> anyhow::Result<()> {
    drivers::register_all(manager).await
}

/// Mount every configured disk / 挂载配置中的所有磁盘
pub async fn mount_disks(manager: &storage::StorageManager, config: &config::AppConfig) -> anyhow::Result<()> {
    for (name, disk) in &config.disks {
        manager.mount(name, &disk.driver, disk.options.clone()).await?;
    }
    Ok(())
}
