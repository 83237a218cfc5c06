use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 待导出的已存储发票 (以文件名为唯一键)
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StoredInvoice {
    pub file_name: String,
    pub raw_text: String,
    pub expense_category: Option<String>,
    pub created_at_millis: i64,
}

impl StoredInvoice {
    /// 新入库记录, 类别为空
    pub fn new(file_name: impl Into<String>, raw_text: impl Into<String>, created_at_millis: i64) -> Self {
        Self {
            file_name: file_name.into(),
            raw_text: raw_text.into(),
            expense_category: None,
            created_at_millis,
        }
    }

    pub fn has_category(&self) -> bool {
        self.expense_category
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false)
    }
}
