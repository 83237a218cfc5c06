use crate::util::amount::{format_amount, to_fixed2, CurrencyTotals, NumberFormat};
use bigdecimal::BigDecimal;

/// 导出单元格
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(BigDecimal),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// 单币种合计为数字, 多币种为带币种标签的文本
    pub fn from_totals(totals: &CurrencyTotals, fmt: &NumberFormat) -> Self {
        if totals.is_empty() {
            return Cell::Number(BigDecimal::from(0));
        }
        match totals.single() {
            Some(amount) => Cell::Number(amount.clone()),
            None => Cell::Text(totals.labeled(fmt)),
        }
    }

    /// 报表显示: 数字两位小数 + 千分位
    pub fn display(&self, fmt: &NumberFormat) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(text) => text.clone(),
            Cell::Number(value) => format_amount(value, fmt),
        }
    }

    /// 表格显示: 数字两位小数, 使用配置的小数点, 不加千分位
    pub fn spreadsheet_value(&self, fmt: &NumberFormat) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(text) => text.clone(),
            Cell::Number(value) => to_fixed2(value).replace('.', &fmt.decimal_separator),
        }
    }

    pub fn as_number(&self) -> Option<&BigDecimal> {
        match self {
            Cell::Number(value) => Some(value),
            _ => None,
        }
    }
}

/// 行类型, 报表据此决定是否加粗
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Title,
    Header,
    Data,
    Blank,
    Subtotal,
    Total,
}

impl RowKind {
    pub fn is_bold(self) -> bool {
        matches!(
            self,
            RowKind::Title | RowKind::Header | RowKind::Subtotal | RowKind::Total
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub kind: RowKind,
    pub cells: Vec<Cell>,
}

/// 按类别 / 冲红分类的凭证合计 (TotalComprobante)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSummary {
    pub document_count: usize,
    pub receiver_id: String,
    pub receiver_name: String,
    pub by_category: Vec<(String, CurrencyTotals)>,
    pub non_reversal: CurrencyTotals,
    /// 冲红凭证合计的绝对值
    pub reversal: CurrencyTotals,
    pub net: CurrencyTotals,
}

/// 定宽表格: 表头行、数据行、空行和汇总行
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMatrix {
    width: usize,
    rows: Vec<ExportRow>,
    pub summary: ExportSummary,
}

impl ExportMatrix {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            rows: Vec::new(),
            summary: ExportSummary::default(),
        }
    }

    /// 追加一行, 不足宽度补空, 超出截断
    pub fn push(&mut self, kind: RowKind, mut cells: Vec<Cell>) {
        cells.resize(self.width, Cell::Empty);
        self.rows.push(ExportRow { kind, cells });
    }

    pub fn push_blank(&mut self) {
        self.push(RowKind::Blank, Vec::new());
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> &[ExportRow] {
        &self.rows
    }

    pub fn rows_of(&self, kind: RowKind) -> impl Iterator<Item = &ExportRow> {
        self.rows.iter().filter(move |r| r.kind == kind)
    }

    pub fn header(&self) -> Option<&ExportRow> {
        self.rows_of(RowKind::Header).next()
    }

    /// 按列名查找列下标
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header()?
            .cells
            .iter()
            .position(|c| matches!(c, Cell::Text(t) if t == name))
    }

    /// 每列字符宽度 (标题行不计入), 限制在 [6, 48]
    pub fn column_widths(&self, fmt: &NumberFormat) -> Vec<usize> {
        let mut widths = vec![6usize; self.width];
        for row in self.rows.iter().filter(|r| r.kind != RowKind::Title) {
            for (idx, cell) in row.cells.iter().enumerate() {
                let len = cell.display(fmt).chars().count();
                widths[idx] = widths[idx].max(len.min(48));
            }
        }
        widths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rows_are_padded_to_fixed_width() {
        let mut matrix = ExportMatrix::new(4);
        matrix.push(RowKind::Header, vec![Cell::text("A"), Cell::text("B")]);
        matrix.push_blank();
        assert!(matrix.rows().iter().all(|r| r.cells.len() == 4));
        assert_eq!(matrix.column_index("B"), Some(1));
    }

    #[test]
    fn multi_currency_totals_render_as_labeled_text() {
        let fmt = NumberFormat::default();
        let mut totals = CurrencyTotals::new();
        totals.add("CRC", &BigDecimal::from_str("1500").unwrap());
        assert_eq!(
            Cell::from_totals(&totals, &fmt),
            Cell::Number(BigDecimal::from_str("1500").unwrap())
        );

        totals.add("USD", &BigDecimal::from_str("10.5").unwrap());
        assert_eq!(
            Cell::from_totals(&totals, &fmt),
            Cell::text("CRC 1,500.00 / USD 10.50")
        );
    }

    #[test]
    fn spreadsheet_numbers_have_two_decimals() {
        let fmt = NumberFormat::default();
        let cell = Cell::Number(BigDecimal::from_str("-1234.5").unwrap());
        assert_eq!(cell.spreadsheet_value(&fmt), "-1234.50");
        assert_eq!(cell.display(&fmt), "-1,234.50");
    }
}
