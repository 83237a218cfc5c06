use crate::db::{InvoiceStore, RemoveReport};
use crate::error::{ParseError, StoreError};
use crate::models::{InvoiceRecord, StoredInvoice};
use crate::parser::parse_document;
use crate::service::aggregator::{group_by_receiver, ReceiverGroup};
use crate::service::ingest::Progress;
use serde::Serialize;
use std::sync::Arc;

/// 工作集中的一张发票: 存储记录 + 重新解析的结果
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceDocument {
    pub file_name: String,
    pub expense_category: Option<String>,
    pub created_at_millis: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<InvoiceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl WorkspaceDocument {
    fn from_stored(stored: StoredInvoice, parsed: Result<InvoiceRecord, ParseError>) -> Self {
        let (record, parse_error) = match parsed {
            Ok(record) => (Some(record), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            file_name: stored.file_name,
            expense_category: stored.expense_category,
            created_at_millis: stored.created_at_millis,
            record,
            parse_error,
        }
    }
}

/// 待导出工作集: 浏览、分类、删除
pub struct InvoiceWorkspace {
    store: Arc<dyn InvoiceStore>,
}

impl InvoiceWorkspace {
    pub fn new(store: Arc<dyn InvoiceStore>) -> Self {
        Self { store }
    }

    pub async fn documents(&self) -> Result<Vec<WorkspaceDocument>, StoreError> {
        let stored = self.store.list_all().await?;
        Ok(stored
            .into_iter()
            .map(|s| {
                let parsed = parse_document(&s.raw_text);
                WorkspaceDocument::from_stored(s, parsed)
            })
            .collect())
    }

    /// 按收票方分组, 无法解析的记录不参与
    pub async fn receiver_groups(&self) -> Result<Vec<ReceiverGroup>, StoreError> {
        let documents = self.documents().await?;
        Ok(group_by_receiver(documents.iter().filter_map(|d| {
            d.record.as_ref().map(|r| (d.file_name.as_str(), r))
        })))
    }

    /// 设置或清除费用类别, 空白视为清除
    pub async fn set_category(
        &self,
        file_name: &str,
        category: Option<&str>,
    ) -> Result<(), StoreError> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        self.store.update_category(file_name, category).await?;
        tracing::info!("{} 类别设为 {:?}", file_name, category);
        Ok(())
    }

    pub async fn remove(&self, file_name: &str) -> Result<(), StoreError> {
        self.store.remove(file_name).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.clear().await?;
        tracing::info!("工作集已清空");
        Ok(())
    }

    /// 删除某个收票方的全部发票 (空字符串表示无证件号的一组)
    pub async fn remove_receiver_group<F>(
        &self,
        receiver_id: &str,
        mut on_progress: F,
    ) -> Result<RemoveReport, StoreError>
    where
        F: FnMut(Progress),
    {
        let receiver_id = receiver_id.trim();
        let file_names = self
            .receiver_groups()
            .await?
            .into_iter()
            .find(|g| g.receiver_id == receiver_id)
            .map(|g| g.file_names)
            .unwrap_or_default();

        let total = file_names.len();
        let mut report = RemoveReport::default();
        for (idx, file_name) in file_names.into_iter().enumerate() {
            match self.store.remove(&file_name).await {
                Ok(()) => report.removed.push(file_name),
                Err(e) => {
                    tracing::warn!("删除 {} 失败: {}", file_name, e);
                    report.failed.push((file_name, e.to_string()));
                }
            }
            on_progress(Progress {
                done: idx + 1,
                total,
            });
        }

        tracing::info!(
            "收票方 {:?} 已删除 {}/{} 张发票",
            receiver_id,
            report.removed.len(),
            total
        );
        Ok(report)
    }
}
