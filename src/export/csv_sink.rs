use crate::error::ExportError;
use crate::export::{write_output, ExportSink};
use crate::models::ExportMatrix;
use crate::util::amount::NumberFormat;
use std::io::Write;
use std::path::PathBuf;

/// 表格导出 (单表 CSV, 带 BOM 以便电子表格识别 UTF-8)
///
/// CSV 无法携带列宽; 需要定宽的表格工具可读取 `ExportMatrix::column_widths()`
/// (与 PDF 报表使用的是同一组列宽)。
#[derive(Debug, Clone)]
pub struct CsvSink {
    output_dir: PathBuf,
    number_format: NumberFormat,
}

impl CsvSink {
    pub fn new(output_dir: impl Into<PathBuf>, number_format: NumberFormat) -> Self {
        Self {
            output_dir: output_dir.into(),
            number_format,
        }
    }

    /// 小数点为逗号时改用分号分隔
    fn delimiter(&self) -> u8 {
        if self.number_format.decimal_separator == "," {
            b';'
        } else {
            b','
        }
    }

    /// 写入任意 writer
    pub fn write_matrix<W: Write>(&self, matrix: &ExportMatrix, writer: W) -> Result<(), String> {
        let mut csv = csv::WriterBuilder::new()
            .delimiter(self.delimiter())
            .terminator(csv::Terminator::CRLF)
            .from_writer(writer);

        for row in matrix.rows() {
            let record: Vec<String> = row
                .cells
                .iter()
                .map(|cell| cell.spreadsheet_value(&self.number_format))
                .collect();
            csv.write_record(&record)
                .map_err(|e| format!("CSV write error: {e}"))?;
        }

        csv.flush().map_err(|e| format!("CSV flush error: {e}"))?;
        Ok(())
    }
}

impl ExportSink for CsvSink {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn render(&self, matrix: &ExportMatrix, file_name: &str) -> Result<PathBuf, ExportError> {
        let path = write_output(&self.output_dir, file_name, self.extension(), |writer| {
            writer
                .write_all("\u{FEFF}".as_bytes())
                .map_err(|e| e.to_string())?;
            self.write_matrix(matrix, writer)
        })?;
        tracing::info!("CSV 已写出: {:?} ({} 行)", path, matrix.rows().len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, RowKind};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn matrix() -> ExportMatrix {
        let mut matrix = ExportMatrix::new(3);
        matrix.push(RowKind::Title, vec![Cell::text("Reporte de gastos")]);
        matrix.push(
            RowKind::Header,
            vec![Cell::text("Emisor"), Cell::text("Moneda"), Cell::text("Total")],
        );
        matrix.push(
            RowKind::Data,
            vec![
                Cell::text("Proveedor, S.A."),
                Cell::text("CRC"),
                Cell::Number(BigDecimal::from_str("1234.5").unwrap()),
            ],
        );
        matrix.push_blank();
        matrix
    }

    #[test]
    fn rows_are_padded_and_numbers_fixed() {
        let sink = CsvSink::new("unused", NumberFormat::default());
        let mut out = Vec::new();
        sink.write_matrix(&matrix(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.split("\r\n").collect();
        assert_eq!(lines[0], "Reporte de gastos,,");
        assert_eq!(lines[2], "\"Proveedor, S.A.\",CRC,1234.50");
        assert_eq!(lines[3], ",,");
    }

    #[test]
    fn comma_decimals_switch_to_semicolons() {
        let fmt = NumberFormat {
            thousands_separator: ".".to_string(),
            decimal_separator: ",".to_string(),
        };
        let sink = CsvSink::new("unused", fmt);
        let mut out = Vec::new();
        sink.write_matrix(&matrix(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Proveedor, S.A.;CRC;1234,50"));
    }

    #[test]
    fn widths_follow_the_rendered_values() {
        let fmt = NumberFormat::default();
        let widths = matrix().column_widths(&fmt);
        // 标题行不计入, 数字按显示格式计宽
        assert_eq!(widths, vec!["Proveedor, S.A.".len(), 6, "1,234.50".len()]);
    }

    #[test]
    fn render_writes_file_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path(), NumberFormat::default());
        let path = sink.render(&matrix(), "gastos_310").unwrap();
        assert_eq!(path, dir.path().join("gastos_310.csv"));
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
    }
}
