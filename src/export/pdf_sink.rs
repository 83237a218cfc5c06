use crate::error::ExportError;
use crate::export::{write_output, ExportSink};
use crate::models::{Cell, ExportMatrix, ExportRow, RowKind};
use crate::util::amount::NumberFormat;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};
use std::path::PathBuf;

// A4 横向, 单位 mm
const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 10.0;
const FOOTER_Y: f32 = 6.0;
const ROW_HEIGHT: f32 = 4.2;
const FONT_SIZE: f32 = 6.0;
const TITLE_FONT_SIZE: f32 = 11.0;
// Helvetica 平均字宽约 0.5em, 1pt = 0.3528mm
const CHAR_WIDTH_MM: f32 = FONT_SIZE * 0.5 * 0.3528;

/// 报表导出: 横向 A4, 每页重复表头, 页脚带页码
#[derive(Debug, Clone)]
pub struct PdfSink {
    output_dir: PathBuf,
    number_format: NumberFormat,
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// 逐页排版的状态
struct PageCursor<'a> {
    doc: &'a PdfDocumentReference,
    fonts: &'a Fonts,
    layer: PdfLayerReference,
    page_no: usize,
    y: f32,
}

impl<'a> PageCursor<'a> {
    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            format!("Página {}", self.page_no + 1),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.page_no += 1;
        self.y = PAGE_HEIGHT - MARGIN;
        self.footer();
    }

    fn footer(&self) {
        self.layer.use_text(
            format!("Página {}", self.page_no),
            FONT_SIZE + 1.0,
            Mm(MARGIN),
            Mm(FOOTER_Y),
            &self.fonts.bold,
        );
    }

    fn fits(&self) -> bool {
        self.y - ROW_HEIGHT >= FOOTER_Y + ROW_HEIGHT
    }

    fn rule(&self, y: f32) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(y)), false),
            ],
            is_closed: false,
        });
    }
}

impl PdfSink {
    pub fn new(output_dir: impl Into<PathBuf>, number_format: NumberFormat) -> Self {
        Self {
            output_dir: output_dir.into(),
            number_format,
        }
    }

    /// 各列起始横坐标, 按列宽比例分配
    fn column_positions(&self, matrix: &ExportMatrix) -> Vec<(f32, f32)> {
        let widths = matrix.column_widths(&self.number_format);
        let total: usize = widths.iter().sum::<usize>().max(1);
        let usable = PAGE_WIDTH - 2.0 * MARGIN;

        let mut x = MARGIN;
        widths
            .iter()
            .map(|w| {
                let width = usable * (*w as f32) / (total as f32);
                let column = (x, width);
                x += width;
                column
            })
            .collect()
    }

    fn draw_row(&self, cursor: &mut PageCursor, row: &ExportRow, columns: &[(f32, f32)]) {
        let font = if row.kind.is_bold() {
            &cursor.fonts.bold
        } else {
            &cursor.fonts.regular
        };
        cursor.y -= ROW_HEIGHT;

        for (cell, (x, width)) in row.cells.iter().zip(columns) {
            let text = cell.display(&self.number_format);
            if text.is_empty() {
                continue;
            }
            let text = fit_text(&text, *width);
            // 数字右对齐
            let x = match cell {
                Cell::Number(_) => x + width - 1.0 - text.chars().count() as f32 * CHAR_WIDTH_MM,
                _ => *x,
            };
            cursor.layer.use_text(text, FONT_SIZE, Mm(x), Mm(cursor.y), font);
        }

        if row.kind == RowKind::Header {
            cursor.rule(cursor.y - 1.2);
        }
    }

    fn build(&self, matrix: &ExportMatrix) -> Result<Vec<u8>, String> {
        let (doc, page, layer) = PdfDocument::new(
            "Reporte de gastos",
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            "Página 1",
        );
        let fonts = Fonts {
            regular: doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| e.to_string())?,
            bold: doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(|e| e.to_string())?,
        };

        let columns = self.column_positions(matrix);
        let header = matrix.header().cloned();
        {
            let mut cursor = PageCursor {
                doc: &doc,
                fonts: &fonts,
                layer: doc.get_page(page).get_layer(layer),
                page_no: 1,
                y: PAGE_HEIGHT - MARGIN,
            };
            cursor.footer();

            for row in matrix.rows() {
                match row.kind {
                    RowKind::Title => {
                        cursor.y -= ROW_HEIGHT + 1.5;
                        let text = row.cells.first().map(|c| c.display(&self.number_format));
                        cursor.layer.use_text(
                            text.unwrap_or_default(),
                            TITLE_FONT_SIZE,
                            Mm(MARGIN),
                            Mm(cursor.y),
                            &fonts.bold,
                        );
                    }
                    RowKind::Blank => cursor.y -= ROW_HEIGHT / 2.0,
                    _ => {
                        if !cursor.fits() {
                            cursor.new_page();
                            if let Some(header) = header.as_ref().filter(|_| row.kind != RowKind::Header) {
                                self.draw_row(&mut cursor, header, &columns);
                            }
                        }
                        self.draw_row(&mut cursor, row, &columns);
                    }
                }
            }
        }

        let mut writer = std::io::BufWriter::new(Vec::<u8>::new());
        doc.save(&mut writer).map_err(|e| e.to_string())?;
        writer.into_inner().map_err(|e| e.to_string())
    }
}

/// 超出列宽时截断
fn fit_text(text: &str, width_mm: f32) -> String {
    let max_chars = ((width_mm - 1.0) / CHAR_WIDTH_MM).floor().max(1.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(2).max(1);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str("..");
    cut
}

impl ExportSink for PdfSink {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render(&self, matrix: &ExportMatrix, file_name: &str) -> Result<PathBuf, ExportError> {
        let bytes = self.build(matrix).map_err(|e| {
            tracing::error!("生成 PDF 失败: {}", e);
            ExportError::Render(e)
        })?;
        let path = write_output(&self.output_dir, file_name, self.extension(), |writer| {
            std::io::Write::write_all(writer, &bytes).map_err(|e| e.to_string())
        })?;
        tracing::info!("PDF 已写出: {:?} ({} 字节)", path, bytes.len());
        Ok(path)
    }
}
