use crate::db::pool::{open_file_pool, open_memory_pool};
use crate::db::queries;
use crate::db::store::InvoiceStore;
use crate::error::StoreError;
use crate::models::StoredInvoice;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::Path;

/// SQLite 持久化存储
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// 打开 (必要时重建) 本地库
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let pool = open_file_pool(path).await?;
        tracing::info!("Invoice store opened at {:?}", path);
        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            pool: open_memory_pool().await?,
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl InvoiceStore for SqliteStore {
    async fn has(&self, file_name: &str) -> Result<bool, StoreError> {
        Ok(queries::exists(&self.pool, file_name).await?)
    }

    async fn put(&self, record: StoredInvoice) -> Result<(), StoreError> {
        Ok(queries::upsert(&self.pool, &record).await?)
    }

    async fn insert_new(&self, record: StoredInvoice) -> Result<bool, StoreError> {
        Ok(queries::insert_new(&self.pool, &record).await?)
    }

    async fn get(&self, file_name: &str) -> Result<Option<StoredInvoice>, StoreError> {
        Ok(queries::find(&self.pool, file_name).await?)
    }

    async fn update_category(
        &self,
        file_name: &str,
        category: Option<&str>,
    ) -> Result<(), StoreError> {
        Ok(queries::set_category(&self.pool, file_name, category).await?)
    }

    async fn remove(&self, file_name: &str) -> Result<(), StoreError> {
        Ok(queries::delete(&self.pool, file_name).await?)
    }

    async fn list_all(&self) -> Result<Vec<StoredInvoice>, StoreError> {
        Ok(queries::list_all(&self.pool).await?)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        queries::delete_all(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_and_category_updates() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .put(StoredInvoice::new("f1.xml", "<FacturaElectronica/>", 5))
            .await
            .unwrap();
        assert!(store.has("f1.xml").await.unwrap());
        assert!(!store.has("f2.xml").await.unwrap());

        store.update_category("f1.xml", Some("07")).await.unwrap();
        let stored = store.get("f1.xml").await.unwrap().unwrap();
        assert_eq!(stored.expense_category.as_deref(), Some("07"));

        store.update_category("f1.xml", None).await.unwrap();
        let stored = store.get("f1.xml").await.unwrap().unwrap();
        assert_eq!(stored.expense_category, None);

        store.update_category("ghost.xml", Some("07")).await.unwrap();
        assert!(store.get("ghost.xml").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_new_never_overwrites() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut first = StoredInvoice::new("a.xml", "<A/>", 1);
        first.expense_category = Some("01".to_string());
        assert!(store.insert_new(first).await.unwrap());
        assert!(!store.insert_new(StoredInvoice::new("a.xml", "<B/>", 2)).await.unwrap());

        let stored = store.get("a.xml").await.unwrap().unwrap();
        assert_eq!(stored.raw_text, "<A/>");
        assert_eq!(stored.expense_category.as_deref(), Some("01"));
    }

    #[tokio::test]
    async fn list_is_ordered_and_clear_empties() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.put(StoredInvoice::new("b.xml", "<B/>", 2)).await.unwrap();
        store.put(StoredInvoice::new("a.xml", "<A/>", 2)).await.unwrap();
        store.put(StoredInvoice::new("c.xml", "<C/>", 1)).await.unwrap();

        let names: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.file_name)
            .collect();
        assert_eq!(names, vec!["c.xml", "a.xml", "b.xml"]);

        let report = store
            .remove_many(&["a.xml".to_string(), "b.xml".to_string()])
            .await;
        assert_eq!(report.removed.len(), 2);
        assert_eq!(store.list_all().await.unwrap().len(), 1);

        store.clear().await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_store_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("invoices.db");

        let store = SqliteStore::open(&path).await.unwrap();
        store.put(StoredInvoice::new("a.xml", "<A/>", 1)).await.unwrap();
        store.close().await;

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert!(reopened.has("a.xml").await.unwrap());
    }

    #[tokio::test]
    async fn corrupted_database_is_recreated_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoices.db");
        std::fs::write(&path, vec![0x42u8; 4096]).unwrap();

        let store = SqliteStore::open(&path).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
        store.put(StoredInvoice::new("a.xml", "<A/>", 1)).await.unwrap();
        assert!(store.has("a.xml").await.unwrap());
    }

    #[tokio::test]
    async fn unrecoverable_location_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        // 路径本身是目录, 删除文件无法修复
        let path = dir.path().join("as_dir.db");
        std::fs::create_dir_all(path.join("inner")).unwrap();

        let result = SqliteStore::open(&path).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn uncreatable_parent_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        // 父路径是普通文件
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let result = SqliteStore::open(&blocker.join("invoices.db")).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
