use oss_disk::cli::Cli;
use oss_disk::config;
use oss_disk::storage::StorageManager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `cat` output stays clean / 日志输出到stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oss_disk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Cli::parse_args();

    // Load configuration / 加载配置
    let app_config = config::load_config(&args.config).map_err(anyhow::Error::msg)?;

    // Initialize storage manager / 初始化存储管理器
    let storage_manager = StorageManager::new();
    oss_disk::register_storage_drivers(&storage_manager).await?;
    oss_disk::mount_disks(&storage_manager, &app_config).await?;

    let name = args.disk.unwrap_or(app_config.default);
    let disk = storage_manager.disk(&name).await?;

    let mut stdout = std::io::stdout();
    oss_disk::cli::run(&disk, args.command, &mut stdout).await
}
