use crate::error::StoreError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// 创建连接池 (单写者, 一个连接即可)
async fn create_pool(options: SqliteConnectOptions) -> Result<SqlitePool, sqlx::Error> {
    // 设置慢查询日志阈值为 5秒
    let options = options.log_slow_statements(
        tracing::log::LevelFilter::Warn,
        Duration::from_secs(5),
    );

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// 建表并做一次探测查询, 损坏的库文件会在这里报错
async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS invoices (
            file_name         TEXT PRIMARY KEY NOT NULL,
            raw_text          TEXT NOT NULL,
            expense_category  TEXT NULL,
            created_at_millis INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices")
        .fetch_one(pool)
        .await?;
    Ok(())
}

async fn try_open(options: SqliteConnectOptions) -> Result<SqlitePool, sqlx::Error> {
    let pool = create_pool(options).await?;
    if let Err(e) = init_schema(&pool).await {
        pool.close().await;
        return Err(e);
    }
    Ok(pool)
}

/// 打开本地库文件; 初始化失败时删除库文件重建一次, 再失败则不可用
pub async fn open_file_pool(path: &Path) -> Result<SqlitePool, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            tracing::error!("无法创建数据目录 {:?}: {}", parent, e);
            StoreError::Unavailable(format!("cannot create {:?}: {}", parent, e))
        })?;
    }
    let options = || {
        SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
    };

    match try_open(options()).await {
        Ok(pool) => Ok(pool),
        Err(first) => {
            tracing::warn!("本地数据库 {:?} 初始化失败, 删除后重建: {}", path, first);
            destroy_database_files(path).map_err(|e| {
                tracing::error!("本地数据库 {:?} 无法删除: {}", path, e);
                StoreError::Unavailable(format!("cannot recreate {:?}: {}", path, e))
            })?;
            try_open(options()).await.map_err(|second| {
                tracing::error!("本地数据库 {:?} 重建失败: {}", path, second);
                StoreError::Unavailable(second.to_string())
            })
        }
    }
}

/// 内存库 (测试用), 连接常驻
pub async fn open_memory_pool() -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    try_open(options)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))
}

fn destroy_database_files(path: &Path) -> std::io::Result<()> {
    let mut candidates = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm", "-journal"] {
        let mut name = path.as_os_str().to_os_string();
        name.push(suffix);
        candidates.push(name.into());
    }
    for candidate in candidates {
        match std::fs::remove_file(&candidate) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
