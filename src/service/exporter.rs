use crate::db::{InvoiceStore, RemoveReport};
use crate::error::ExportError;
use crate::export::{CsvSink, ExportFormat, ExportSink, PdfSink};
use crate::models::{ExportMatrix, ExportSummary};
use crate::service::aggregator::{AggregationEngine, ExportOptions};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// 导出请求
#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    pub format: ExportFormat,
    #[serde(default)]
    pub allow_missing_category: bool,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// 导出结果
#[derive(Debug, Clone, Serialize)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub document_count: usize,
    pub receiver_id: String,
    pub receiver_name: String,
    /// 净额, 多币种时按币种列出
    pub net_total: String,
    pub removal: RemoveReport,
    #[serde(skip)]
    pub summary: ExportSummary,
}

/// 导出并清空: 快照 -> 汇总 -> 写文件 -> 删除快照中的发票
pub struct ExportService {
    store: Arc<dyn InvoiceStore>,
    engine: Arc<AggregationEngine>,
    csv: Arc<dyn ExportSink>,
    pdf: Arc<dyn ExportSink>,
}

impl ExportService {
    pub fn new(
        store: Arc<dyn InvoiceStore>,
        engine: AggregationEngine,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let output_dir = output_dir.into();
        let fmt = engine.number_format().clone();
        Self {
            store,
            csv: Arc::new(CsvSink::new(output_dir.clone(), fmt.clone())),
            pdf: Arc::new(PdfSink::new(output_dir, fmt)),
            engine: Arc::new(engine),
        }
    }

    /// 替换某种格式的输出端
    pub fn with_sink(mut self, format: ExportFormat, sink: Arc<dyn ExportSink>) -> Self {
        match format {
            ExportFormat::Csv => self.csv = sink,
            ExportFormat::Pdf => self.pdf = sink,
        }
        self
    }

    fn sink(&self, format: ExportFormat) -> Arc<dyn ExportSink> {
        match format {
            ExportFormat::Csv => self.csv.clone(),
            ExportFormat::Pdf => self.pdf.clone(),
        }
    }

    /// 只生成表格, 不写文件也不清空
    pub async fn preview(&self, allow_missing_category: bool) -> Result<ExportMatrix, ExportError> {
        let snapshot = self.store.list_all().await?;
        self.engine
            .build_export(&snapshot, ExportOptions { allow_missing_category })
    }

    pub async fn export_and_clear(&self, request: ExportRequest) -> Result<ExportOutcome, ExportError> {
        let snapshot = self.store.list_all().await?;
        let matrix = self.engine.build_export(
            &snapshot,
            ExportOptions {
                allow_missing_category: request.allow_missing_category,
            },
        )?;

        let file_name = request
            .file_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_file_name(&matrix.summary.receiver_id));

        // 写文件在阻塞线程执行, 失败时不触碰存储
        let sink = self.sink(request.format);
        let (matrix, rendered) = tokio::task::spawn_blocking(move || {
            let rendered = sink.render(&matrix, &file_name);
            (matrix, rendered)
        })
        .await
        .map_err(|e| ExportError::Render(format!("render task failed: {}", e)))?;
        let path = rendered?;

        let names: Vec<String> = snapshot.into_iter().map(|s| s.file_name).collect();
        let removal = self.store.remove_many(&names).await;
        if !removal.is_complete() {
            tracing::warn!(
                "导出后 {} 张发票未能删除",
                removal.failed.len()
            );
        }

        let summary = matrix.summary;
        tracing::info!(
            "导出完成: {} 张发票, 收票方 {}, 文件 {:?}",
            summary.document_count,
            summary.receiver_id,
            path
        );

        Ok(ExportOutcome {
            path,
            format: request.format,
            document_count: summary.document_count,
            receiver_id: summary.receiver_id.clone(),
            receiver_name: summary.receiver_name.clone(),
            net_total: summary.net.labeled(self.engine.number_format()),
            removal,
            summary,
        })
    }
}

/// gastos_{收票方证件号}_{YYYYMMDD}
pub fn default_file_name(receiver_id: &str) -> String {
    let receiver = if receiver_id.trim().is_empty() {
        "sin_receptor"
    } else {
        receiver_id.trim()
    };
    format!("gastos_{}_{}", receiver, Local::now().format("%Y%m%d"))
}
