pub mod csv_sink;
pub mod pdf_sink;

pub use csv_sink::CsvSink;
pub use pdf_sink::PdfSink;

use crate::error::ExportError;
use crate::models::ExportMatrix;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Pdf,
}

/// 表格输出端: 把 ExportMatrix 写成文件, 返回文件路径
pub trait ExportSink: Send + Sync {
    fn extension(&self) -> &'static str;

    fn render(&self, matrix: &ExportMatrix, file_name: &str) -> Result<PathBuf, ExportError>;
}

/// 文件名只保留字母数字和 `._ -`, 去掉重复的扩展名
pub fn sanitize_file_name(file_name: &str, extension: &str) -> String {
    let trimmed = file_name.trim();
    let suffix = format!(".{}", extension);
    let stem = if trimmed.to_ascii_lowercase().ends_with(&suffix) {
        &trimmed[..trimmed.len() - suffix.len()]
    } else {
        trimmed
    };

    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ' ' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == ' ').to_string();
    if cleaned.is_empty() {
        "export".to_string()
    } else {
        cleaned
    }
}

/// 先写临时文件, 成功后再改名; 失败时删除临时文件
pub(crate) fn write_output<F>(
    output_dir: &Path,
    file_name: &str,
    extension: &str,
    write: F,
) -> Result<PathBuf, ExportError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), String>,
{
    fs::create_dir_all(output_dir)
        .map_err(|e| ExportError::Render(format!("cannot create {:?}: {}", output_dir, e)))?;

    let stem = sanitize_file_name(file_name, extension);
    let target = output_dir.join(format!("{}.{}", stem, extension));
    let partial = output_dir.join(format!("{}.{}.part", stem, extension));

    let result = File::create(&partial)
        .map_err(|e| e.to_string())
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write(&mut writer)?;
            writer.flush().map_err(|e| e.to_string())
        })
        .and_then(|_| fs::rename(&partial, &target).map_err(|e| e.to_string()));

    match result {
        Ok(()) => Ok(target),
        Err(message) => {
            let _ = fs::remove_file(&partial);
            tracing::error!("写出 {:?} 失败: {}", target, message);
            Err(ExportError::Render(message))
        }
    }
}
