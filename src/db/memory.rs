use crate::db::store::InvoiceStore;
use crate::error::StoreError;
use crate::models::StoredInvoice;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// 进程内存储 (测试及临时会话)
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, StoredInvoice>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn has(&self, file_name: &str) -> Result<bool, StoreError> {
        Ok(self.records.contains_key(file_name))
    }

    async fn put(&self, record: StoredInvoice) -> Result<(), StoreError> {
        self.records.insert(record.file_name.clone(), record);
        Ok(())
    }

    async fn insert_new(&self, record: StoredInvoice) -> Result<bool, StoreError> {
        match self.records.entry(record.file_name.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }

    async fn get(&self, file_name: &str) -> Result<Option<StoredInvoice>, StoreError> {
        Ok(self.records.get(file_name).map(|r| r.value().clone()))
    }

    async fn update_category(
        &self,
        file_name: &str,
        category: Option<&str>,
    ) -> Result<(), StoreError> {
        if let Some(mut record) = self.records.get_mut(file_name) {
            record.expense_category = category.map(str::to_string);
        }
        Ok(())
    }

    async fn remove(&self, file_name: &str) -> Result<(), StoreError> {
        self.records.remove(file_name);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<StoredInvoice>, StoreError> {
        let mut all: Vec<StoredInvoice> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| {
            a.created_at_millis
                .cmp(&b.created_at_millis)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        Ok(all)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.records.clear();
        Ok(())
    }
}
