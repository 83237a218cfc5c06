use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 未分类发票的显示标签
pub const UNASSIGNED_LABEL: &str = "SIN TIPO";

/// 费用类别目录项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub account: Option<String>,
}

/// 费用类别目录 (只读)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseCatalog {
    entries: Vec<CatalogEntry>,
}

impl ExpenseCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// 从 JSON 文件加载: [{"code": "...", "name": "...", "account": "..."}]
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// 构建 code -> "name (code)" 和 code -> account 两张表, 忽略空代码或空名称
    pub fn lookup(&self) -> CategoryLookup {
        let mut labels = HashMap::new();
        let mut accounts = HashMap::new();
        for entry in &self.entries {
            let code = entry.code.trim();
            let name = entry.name.trim();
            if code.is_empty() || name.is_empty() {
                continue;
            }
            labels
                .entry(code.to_string())
                .or_insert_with(|| format!("{} ({})", name, code));
            if let Some(account) = entry.account.as_deref().map(str::trim) {
                if !account.is_empty() {
                    accounts
                        .entry(code.to_string())
                        .or_insert_with(|| account.to_string());
                }
            }
        }
        CategoryLookup { labels, accounts }
    }
}

/// 每次导出时从目录构建的查找表
#[derive(Debug, Clone, Default)]
pub struct CategoryLookup {
    labels: HashMap<String, String>,
    accounts: HashMap<String, String>,
}

impl CategoryLookup {
    /// 类别代码 -> 显示标签; 未分类为 "SIN TIPO", 目录外代码原样显示
    pub fn label(&self, category: Option<&str>) -> String {
        match category.map(str::trim).filter(|c| !c.is_empty()) {
            None => UNASSIGNED_LABEL.to_string(),
            Some(code) => self
                .labels
                .get(code)
                .cloned()
                .unwrap_or_else(|| code.to_string()),
        }
    }

    pub fn account(&self, category: Option<&str>) -> &str {
        category
            .map(str::trim)
            .and_then(|code| self.accounts.get(code))
            .map(String::as_str)
            .unwrap_or("")
    }
}
