use crate::models::StoredInvoice;
use sqlx::SqlitePool;

/// 是否已存在
pub async fn exists(pool: &SqlitePool, file_name: &str) -> Result<bool, sqlx::Error> {
    let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM invoices WHERE file_name = ?1")
        .bind(file_name)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// 写入或覆盖
pub async fn upsert(pool: &SqlitePool, record: &StoredInvoice) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO invoices (file_name, raw_text, expense_category, created_at_millis)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(file_name) DO UPDATE SET
            raw_text = excluded.raw_text,
            expense_category = excluded.expense_category,
            created_at_millis = excluded.created_at_millis
        "#,
    )
    .bind(&record.file_name)
    .bind(&record.raw_text)
    .bind(&record.expense_category)
    .bind(record.created_at_millis)
    .execute(pool)
    .await?;
    Ok(())
}

/// 仅在文件名不存在时写入, 返回是否写入
pub async fn insert_new(pool: &SqlitePool, record: &StoredInvoice) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO invoices (file_name, raw_text, expense_category, created_at_millis)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(file_name) DO NOTHING
        "#,
    )
    .bind(&record.file_name)
    .bind(&record.raw_text)
    .bind(&record.expense_category)
    .bind(record.created_at_millis)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// 查询单条
pub async fn find(pool: &SqlitePool, file_name: &str) -> Result<Option<StoredInvoice>, sqlx::Error> {
    sqlx::query_as::<_, StoredInvoice>(
        r#"
        SELECT file_name, raw_text, expense_category, created_at_millis
        FROM invoices
        WHERE file_name = ?1
        "#,
    )
    .bind(file_name)
    .fetch_optional(pool)
    .await
}

/// 更新费用类别
pub async fn set_category(
    pool: &SqlitePool,
    file_name: &str,
    category: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE invoices SET expense_category = ?1 WHERE file_name = ?2")
        .bind(category)
        .bind(file_name)
        .execute(pool)
        .await?;
    Ok(())
}

/// 删除单条
pub async fn delete(pool: &SqlitePool, file_name: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM invoices WHERE file_name = ?1")
        .bind(file_name)
        .execute(pool)
        .await?;
    Ok(())
}

/// 全部记录, 按入库时间、文件名排序
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<StoredInvoice>, sqlx::Error> {
    sqlx::query_as::<_, StoredInvoice>(
        r#"
        SELECT file_name, raw_text, expense_category, created_at_millis
        FROM invoices
        ORDER BY created_at_millis ASC, file_name ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// 清空
pub async fn delete_all(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM invoices").execute(pool).await?;
    tracing::debug!("清空待导出发票, 影响 {} 行", result.rows_affected());
    Ok(result.rows_affected())
}
