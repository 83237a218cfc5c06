use crate::error::ExportError;
use crate::models::tax::tax_column_label;
use crate::models::{
    CategoryLookup, Cell, ExpenseCatalog, ExportMatrix, ExportSummary, InvoiceRecord,
    ReversalPolicy, RowKind, StoredInvoice,
};
use crate::parser::parse_document;
use crate::util::amount::{parse_amount, try_parse_amount, CurrencyTotals, NumberFormat};
use crate::util::collate;
use bigdecimal::{BigDecimal, Zero};
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;

/// 表头: 前导文本列
const LEAD_COLUMNS: [&str; 9] = [
    "Tipo de gasto",
    "Cuenta",
    "Tipo de documento",
    "Fecha de emisión",
    "Consecutivo",
    "Emisor",
    "Identificación emisor",
    "Moneda",
    "Tipo de cambio",
];
const SALE_COLUMNS: [&str; 3] = ["Total venta", "Descuentos", "Venta neta"];
const TOTAL_COLUMNS: [&str; 3] = ["Total impuesto", "Otros cargos", "Total comprobante"];
const TAIL_COLUMNS: [&str; 2] = ["Clave", "Archivo"];

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// 允许未分类发票 (显示为 "SIN TIPO")
    pub allow_missing_category: bool,
}

/// 收票方分组 (空证件号为单独一组, 排最后)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiverGroup {
    pub receiver_id: String,
    pub receiver_name: String,
    pub file_names: Vec<String>,
}

impl ReceiverGroup {
    pub fn display(&self) -> String {
        match (self.receiver_id.is_empty(), self.receiver_name.is_empty()) {
            (true, _) => "(sin identificación)".to_string(),
            (false, true) => self.receiver_id.clone(),
            (false, false) => format!("{} ({})", self.receiver_name, self.receiver_id),
        }
    }
}

/// 按收票方证件号分组
pub fn group_by_receiver<'a, I>(documents: I) -> Vec<ReceiverGroup>
where
    I: IntoIterator<Item = (&'a str, &'a InvoiceRecord)>,
{
    let mut groups: IndexMap<String, ReceiverGroup> = IndexMap::new();
    for (file_name, record) in documents {
        let id = record.receiver_id().to_string();
        let group = groups.entry(id.clone()).or_insert_with(|| ReceiverGroup {
            receiver_id: id,
            receiver_name: String::new(),
            file_names: Vec::new(),
        });
        if group.receiver_name.is_empty() {
            group.receiver_name = record.receiver_name().to_string();
        }
        group.file_names.push(file_name.to_string());
    }

    let mut groups: Vec<ReceiverGroup> = groups.into_values().collect();
    groups.sort_by(|a, b| {
        match (a.receiver_id.is_empty(), b.receiver_id.is_empty()) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => collate::compare(&a.receiver_id, &b.receiver_id),
        }
    });
    groups
}

/// 已解析的存储记录
struct ParsedInvoice<'a> {
    stored: &'a StoredInvoice,
    record: InvoiceRecord,
}

/// 一张发票的导出行 (金额已按冲红取反)
struct ExportLine<'a> {
    stored: &'a StoredInvoice,
    record: InvoiceRecord,
    category_label: String,
    account: String,
    reversal: bool,
    currency: String,
    /// 依次为: 销售三列, 各税额列, 合计三列
    money: Vec<BigDecimal>,
    /// 明细行单元格; 无法解析的金额保留原文
    detail: Vec<Cell>,
}

/// 各金额列的分币种累计
#[derive(Debug, Clone)]
struct ColumnTotals(Vec<CurrencyTotals>);

impl ColumnTotals {
    fn new(columns: usize) -> Self {
        Self(vec![CurrencyTotals::new(); columns])
    }

    fn add(&mut self, currency: &str, money: &[BigDecimal]) {
        for (totals, amount) in self.0.iter_mut().zip(money) {
            totals.add(currency, amount);
        }
    }

    fn negated(&self) -> Self {
        Self(self.0.iter().map(CurrencyTotals::negated).collect())
    }

    fn minus(&self, other: &ColumnTotals) -> Self {
        Self(
            self.0
                .iter()
                .zip(&other.0)
                .map(|(a, b)| a.minus(b))
                .collect(),
        )
    }

    fn last(&self) -> CurrencyTotals {
        self.0.last().cloned().unwrap_or_default()
    }
}

/// 汇总与导出引擎: 分组、冲红取反、按税种拆分, 生成定宽表格
pub struct AggregationEngine {
    lookup: CategoryLookup,
    reversal: ReversalPolicy,
    number_format: NumberFormat,
    default_currency: String,
}

impl AggregationEngine {
    pub fn new(catalog: &ExpenseCatalog, reversal: ReversalPolicy) -> Self {
        Self {
            lookup: catalog.lookup(),
            reversal,
            number_format: NumberFormat::default(),
            default_currency: "CRC".to_string(),
        }
    }

    pub fn with_number_format(mut self, number_format: NumberFormat) -> Self {
        self.number_format = number_format;
        self
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn number_format(&self) -> &NumberFormat {
        &self.number_format
    }

    /// 冲红判定
    pub fn is_reversal(&self, record: &InvoiceRecord) -> bool {
        self.reversal
            .is_reversal(record.document_type_code.as_deref())
    }

    pub fn build_export(
        &self,
        records: &[StoredInvoice],
        options: ExportOptions,
    ) -> Result<ExportMatrix, ExportError> {
        if records.is_empty() {
            return Err(ExportError::NoDocuments);
        }

        let parsed = parse_all(records)?;

        let groups = group_by_receiver(
            parsed
                .iter()
                .map(|p| (p.stored.file_name.as_str(), &p.record)),
        );
        if groups.len() > 1 {
            return Err(ExportError::MultipleReceivers {
                count: groups.len(),
                receivers: groups.iter().map(ReceiverGroup::display).collect(),
            });
        }
        let receiver = groups.into_iter().next().ok_or(ExportError::NoDocuments)?;

        let missing = records.iter().filter(|r| !r.has_category()).count();
        if missing > 0 && !options.allow_missing_category {
            return Err(ExportError::MissingCategory(missing));
        }

        let tax_columns = discover_tax_columns(&parsed);
        let mut lines: Vec<ExportLine> = parsed
            .into_iter()
            .map(|p| self.to_line(p, &tax_columns))
            .collect();
        lines.sort_by(compare_lines);

        tracing::debug!(
            "汇总 {} 张发票, {} 个税额列, 收票方 {}",
            lines.len(),
            tax_columns.len(),
            receiver.display()
        );

        Ok(self.render(&receiver, &tax_columns, &lines))
    }

    fn to_line<'a>(
        &self,
        parsed: ParsedInvoice<'a>,
        tax_columns: &[(String, String)],
    ) -> ExportLine<'a> {
        let ParsedInvoice { stored, record } = parsed;
        let reversal = self.is_reversal(&record);
        let category = stored.expense_category.as_deref();

        // 每张发票只取反一次
        let sign = if reversal {
            BigDecimal::from(-1)
        } else {
            BigDecimal::from(1)
        };

        let columns = SALE_COLUMNS.len() + tax_columns.len() + TOTAL_COLUMNS.len();
        let mut cells: Vec<(BigDecimal, Cell)> = Vec::with_capacity(columns);
        let currency = match record.summary.as_ref() {
            Some(summary) => {
                cells.push(signed_field(summary.total_sale.as_deref(), &sign));
                cells.push(signed_field(summary.total_discounts.as_deref(), &sign));
                cells.push(signed_field(summary.net_sale.as_deref(), &sign));
                for (code, rate_code) in tax_columns {
                    let amount = summary
                        .tax_breakdown
                        .iter()
                        .filter(|line| {
                            line.tax_code.as_deref().unwrap_or("") == code
                                && line.tax_rate_code.as_deref().unwrap_or("") == rate_code
                        })
                        .map(|line| parse_amount(line.tax_amount.as_deref().unwrap_or("")))
                        .fold(BigDecimal::zero(), |acc, v| acc + v)
                        * &sign;
                    cells.push((amount.clone(), Cell::Number(amount)));
                }
                cells.push(signed_field(summary.total_tax.as_deref(), &sign));
                cells.push(signed_field(summary.other_charges.as_deref(), &sign));
                cells.push(signed_field(summary.total_document.as_deref(), &sign));
                summary
                    .currency_code
                    .clone()
                    .unwrap_or_else(|| self.default_currency.clone())
            }
            None => {
                cells.resize(columns, (BigDecimal::zero(), Cell::Number(BigDecimal::zero())));
                self.default_currency.clone()
            }
        };
        let (money, detail): (Vec<BigDecimal>, Vec<Cell>) = cells.into_iter().unzip();

        ExportLine {
            stored,
            category_label: self.lookup.label(category),
            account: self.lookup.account(category).to_string(),
            reversal,
            currency,
            money,
            detail,
            record,
        }
    }

    fn render(
        &self,
        receiver: &ReceiverGroup,
        tax_columns: &[(String, String)],
        lines: &[ExportLine],
    ) -> ExportMatrix {
        let fmt = &self.number_format;
        let money_columns = SALE_COLUMNS.len() + tax_columns.len() + TOTAL_COLUMNS.len();
        let width = LEAD_COLUMNS.len() + money_columns + TAIL_COLUMNS.len();
        let total_tax_idx = LEAD_COLUMNS.len() + money_columns - 3;
        let total_doc_idx = LEAD_COLUMNS.len() + money_columns - 1;

        let mut matrix = ExportMatrix::new(width);
        matrix.push(RowKind::Title, vec![Cell::text("Reporte de gastos")]);
        matrix.push(
            RowKind::Title,
            vec![Cell::text(format!("Receptor: {}", receiver.display()))],
        );
        matrix.push_blank();

        let header: Vec<Cell> = LEAD_COLUMNS
            .iter()
            .chain(SALE_COLUMNS.iter())
            .map(|c| Cell::text(*c))
            .chain(
                tax_columns
                    .iter()
                    .map(|(code, rate)| Cell::text(tax_column_label(code, rate))),
            )
            .chain(TOTAL_COLUMNS.iter().chain(TAIL_COLUMNS.iter()).map(|c| Cell::text(*c)))
            .collect();
        matrix.push(RowKind::Header, header);

        let mut by_category: IndexMap<String, ColumnTotals> = IndexMap::new();
        let mut non_reversal = ColumnTotals::new(money_columns);
        let mut reversal_signed = ColumnTotals::new(money_columns);
        let mut grand = ColumnTotals::new(money_columns);

        for line in lines {
            let record = &line.record;
            let mut cells = vec![
                Cell::text(line.category_label.as_str()),
                Cell::text(line.account.as_str()),
                Cell::text(record.document_type_label.as_str()),
                Cell::text(record.issue_date.clone().unwrap_or_default()),
                Cell::text(record.consecutive_number.clone().unwrap_or_default()),
                Cell::text(record.issuer_name()),
                Cell::text(record.issuer_id()),
                Cell::text(line.currency.as_str()),
                // 汇率原样显示
                Cell::text(
                    record
                        .summary
                        .as_ref()
                        .and_then(|s| s.exchange_rate.clone())
                        .unwrap_or_default(),
                ),
            ];
            cells.extend(line.detail.iter().cloned());
            cells.push(Cell::text(record.key.clone().unwrap_or_default()));
            cells.push(Cell::text(line.stored.file_name.as_str()));
            matrix.push(RowKind::Data, cells);

            by_category
                .entry(line.category_label.clone())
                .or_insert_with(|| ColumnTotals::new(money_columns))
                .add(&line.currency, &line.money);
            if line.reversal {
                reversal_signed.add(&line.currency, &line.money);
            } else {
                non_reversal.add(&line.currency, &line.money);
            }
            grand.add(&line.currency, &line.money);
        }

        matrix.push_blank();
        for (label, totals) in &by_category {
            matrix.push(
                RowKind::Subtotal,
                self.money_row(format!("Subtotal {}", label), totals),
            );
        }

        // 冲红合计取绝对值显示, 净额 = 非冲红 - 冲红
        let reversal_magnitude = reversal_signed.negated();
        let net = non_reversal.minus(&reversal_magnitude);

        matrix.push_blank();
        for (label, totals) in [
            ("Total documentos", &non_reversal),
            ("Total notas de crédito", &reversal_magnitude),
            ("Total neto", &net),
        ] {
            let mut cells = vec![Cell::Empty; width];
            cells[0] = Cell::text(label);
            let offset = LEAD_COLUMNS.len();
            cells[total_tax_idx] = Cell::from_totals(&totals.0[total_tax_idx - offset], fmt);
            cells[total_doc_idx] = Cell::from_totals(&totals.0[total_doc_idx - offset], fmt);
            matrix.push(RowKind::Total, cells);
        }

        matrix.push_blank();
        matrix.push(RowKind::Total, self.money_row("TOTAL GENERAL".to_string(), &grand));

        matrix.summary = ExportSummary {
            document_count: lines.len(),
            receiver_id: receiver.receiver_id.clone(),
            receiver_name: receiver.receiver_name.clone(),
            by_category: by_category
                .iter()
                .map(|(label, totals)| (label.clone(), totals.last()))
                .collect(),
            non_reversal: non_reversal.last(),
            reversal: reversal_magnitude.last(),
            net: net.last(),
        };
        matrix
    }

    /// 首列为标签, 金额列填合计
    fn money_row(&self, label: String, totals: &ColumnTotals) -> Vec<Cell> {
        let mut cells = vec![Cell::text(label)];
        cells.resize(LEAD_COLUMNS.len(), Cell::Empty);
        cells.extend(
            totals
                .0
                .iter()
                .map(|t| Cell::from_totals(t, &self.number_format)),
        );
        cells
    }
}

/// 取反后的金额和明细单元格; 无法解析时按 0 计入合计, 明细保留原文
fn signed_field(raw: Option<&str>, sign: &BigDecimal) -> (BigDecimal, Cell) {
    let raw = raw.unwrap_or("");
    match try_parse_amount(raw) {
        Some(value) => {
            let value = value * sign;
            (value.clone(), Cell::Number(value))
        }
        None => (BigDecimal::zero(), Cell::text(raw.trim())),
    }
}

/// 并行重新解析原文, 保持输入顺序
fn parse_all(records: &[StoredInvoice]) -> Result<Vec<ParsedInvoice<'_>>, ExportError> {
    records
        .par_iter()
        .map(|stored| {
            parse_document(&stored.raw_text)
                .map(|record| ParsedInvoice { stored, record })
                .map_err(|source| ExportError::Document {
                    file_name: stored.file_name.clone(),
                    source,
                })
        })
        .collect()
}

/// 收集所有 (税种, 税率代码) 组合, 按列标题排序
fn discover_tax_columns(parsed: &[ParsedInvoice]) -> Vec<(String, String)> {
    let pairs: IndexSet<(String, String)> = parsed
        .iter()
        .filter_map(|p| p.record.summary.as_ref())
        .flat_map(|summary| summary.tax_breakdown.iter())
        .map(|line| {
            (
                line.tax_code.clone().unwrap_or_default(),
                line.tax_rate_code.clone().unwrap_or_default(),
            )
        })
        .collect();

    let mut columns: Vec<(String, String)> = pairs.into_iter().collect();
    columns.sort_by(|a, b| {
        collate::compare(&tax_column_label(&a.0, &a.1), &tax_column_label(&b.0, &b.1))
            .then_with(|| a.cmp(b))
    });
    columns
}

/// 类别 -> 开票日期 -> 开票方 -> 流水号 -> 文件名
fn compare_lines(a: &ExportLine, b: &ExportLine) -> Ordering {
    collate::compare(&a.category_label, &b.category_label)
        .then_with(|| {
            collate::compare(
                a.record.issue_date.as_deref().unwrap_or(""),
                b.record.issue_date.as_deref().unwrap_or(""),
            )
        })
        .then_with(|| collate::compare(a.record.issuer_name(), b.record.issuer_name()))
        .then_with(|| {
            collate::compare(
                a.record.consecutive_number.as_deref().unwrap_or(""),
                b.record.consecutive_number.as_deref().unwrap_or(""),
            )
        })
        .then_with(|| collate::compare(&a.stored.file_name, &b.stored.file_name))
}
