use crate::db::InvoiceStore;
use crate::error::StoreError;
use crate::models::StoredInvoice;
use crate::parser::parse_document;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 单个文件的入库结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum IngestResult {
    Added,
    Duplicate,
    Invalid(String),
}

/// 待入库文件
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingFile {
    pub file_name: String,
    pub content: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl IncomingFile {
    pub fn new(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
            content_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub file_name: String,
    #[serde(flatten)]
    pub result: IngestResult,
}

/// 批量入库汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub results: Vec<IngestReport>,
    pub added: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

/// 进度 (已处理, 总数)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

/// 扩展名或 MIME 预筛选, 以解析结果为准
pub fn looks_like_xml(file_name: &str, content_type: Option<&str>) -> bool {
    file_name.to_ascii_lowercase().ends_with(".xml")
        || content_type
            .map(|ct| ct.to_ascii_lowercase().contains("xml"))
            .unwrap_or(false)
}

/// 入库流程: 查重 -> 预筛选 -> 解析校验 -> 写入
pub struct IngestionPipeline {
    store: Arc<dyn InvoiceStore>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn InvoiceStore>) -> Self {
        Self { store }
    }

    pub async fn ingest(&self, file_name: &str, raw_text: &str) -> Result<IngestResult, StoreError> {
        self.ingest_file(&IncomingFile::new(file_name, raw_text)).await
    }

    pub async fn ingest_file(&self, file: &IncomingFile) -> Result<IngestResult, StoreError> {
        let file_name = file.file_name.trim();
        if file_name.is_empty() {
            return Ok(IngestResult::Invalid("empty file name".to_string()));
        }

        if self.store.has(file_name).await? {
            tracing::warn!("{} 已存在, 跳过", file_name);
            return Ok(IngestResult::Duplicate);
        }

        if !looks_like_xml(file_name, file.content_type.as_deref()) {
            tracing::warn!("{} 不是 XML 文件", file_name);
            return Ok(IngestResult::Invalid("not an XML document".to_string()));
        }

        // 只做校验, 解析结果不保存; 展示和导出时按原文重新解析
        if let Err(e) = parse_document(&file.content) {
            tracing::warn!("{} 解析失败: {}", file_name, e);
            return Ok(IngestResult::Invalid(e.to_string()));
        }

        // 并发请求可能同时通过上面的查重, 以原子写入的结果为准
        let record = StoredInvoice::new(file_name, file.content.clone(), Utc::now().timestamp_millis());
        if !self.store.insert_new(record).await? {
            tracing::warn!("{} 已存在, 跳过", file_name);
            return Ok(IngestResult::Duplicate);
        }
        tracing::info!("{} 已入库", file_name);
        Ok(IngestResult::Added)
    }

    /// 逐个处理; 单个文件失败不中断批次, 存储故障则中止
    pub async fn ingest_batch<F>(
        &self,
        files: &[IncomingFile],
        mut on_progress: F,
    ) -> Result<BatchReport, StoreError>
    where
        F: FnMut(Progress),
    {
        let total = files.len();
        let mut report = BatchReport::default();

        for (idx, file) in files.iter().enumerate() {
            let result = self.ingest_file(file).await?;
            match &result {
                IngestResult::Added => report.added += 1,
                IngestResult::Duplicate => report.duplicates += 1,
                IngestResult::Invalid(_) => report.invalid += 1,
            }
            report.results.push(IngestReport {
                file_name: file.file_name.trim().to_string(),
                result,
            });

            let done = idx + 1;
            on_progress(Progress { done, total });
            if done == 1 || done % 50 == 0 || done == total {
                tracing::info!(
                    "入库进度: {}/{}, 新增: {}, 重复: {}, 无效: {}",
                    done, total, report.added, report.duplicates, report.invalid
                );
            }
        }

        Ok(report)
    }
}
