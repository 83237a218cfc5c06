use crate::error::StoreError;
use crate::models::StoredInvoice;
use async_trait::async_trait;
use serde::Serialize;

/// 批量删除结果: 逐个记录成功与失败
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoveReport {
    pub removed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl RemoveReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 以文件名为键的待导出发票存储
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn has(&self, file_name: &str) -> Result<bool, StoreError>;

    /// 无条件写入 (调用方先做重复检查)
    async fn put(&self, record: StoredInvoice) -> Result<(), StoreError>;

    /// 键不存在时才写入, 返回是否写入; 查重与写入在同一步完成
    async fn insert_new(&self, record: StoredInvoice) -> Result<bool, StoreError>;

    async fn get(&self, file_name: &str) -> Result<Option<StoredInvoice>, StoreError>;

    /// 记录不存在时什么也不做
    async fn update_category(
        &self,
        file_name: &str,
        category: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn remove(&self, file_name: &str) -> Result<(), StoreError>;

    /// 逐个删除, 单个失败不影响其余
    async fn remove_many(&self, file_names: &[String]) -> RemoveReport {
        let mut report = RemoveReport::default();
        for file_name in file_names {
            match self.remove(file_name).await {
                Ok(()) => report.removed.push(file_name.clone()),
                Err(e) => {
                    tracing::warn!("删除 {} 失败: {}", file_name, e);
                    report.failed.push((file_name.clone(), e.to_string()));
                }
            }
        }
        report
    }

    /// 按入库时间、文件名排序
    async fn list_all(&self) -> Result<Vec<StoredInvoice>, StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}
