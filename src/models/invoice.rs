use serde::{Deserialize, Serialize};

/// 解析后的电子发票 (只含表头、当事方和汇总, 不含明细行)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub document_type_code: Option<String>,
    /// 已知类型为中文名, 未知类型保留根元素名
    pub document_type_label: String,
    pub transaction_type_codes: Vec<String>,
    pub key: Option<String>,
    pub consecutive_number: Option<String>,
    pub issue_date: Option<String>,
    pub systems_provider: Option<String>,
    pub issuer_activity_code: Option<String>,
    pub receiver_activity_code: Option<String>,
    pub sale_condition: Option<String>,
    pub sale_condition_other: Option<String>,
    pub issuer: Option<Party>,
    pub receiver: Option<Party>,
    pub summary: Option<Summary>,
}

impl InvoiceRecord {
    /// 收票方证件号, 缺失时为空串
    pub fn receiver_id(&self) -> &str {
        self.receiver
            .as_ref()
            .and_then(|p| p.id_number.as_deref())
            .map(str::trim)
            .unwrap_or("")
    }

    pub fn receiver_name(&self) -> &str {
        self.receiver
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .unwrap_or("")
    }

    pub fn issuer_name(&self) -> &str {
        self.issuer
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .unwrap_or("")
    }

    pub fn issuer_id(&self) -> &str {
        self.issuer
            .as_ref()
            .and_then(|p| p.id_number.as_deref())
            .unwrap_or("")
    }
}

/// 开票方 / 收票方
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub name: Option<String>,
    pub id_type: Option<String>,
    pub id_number: Option<String>,
    pub trade_name: Option<String>,
    pub email: Option<String>,
    /// "CodigoPais NumTelefono"
    pub phone: Option<String>,
    /// 省 - 县 - 区 - 街区 - 其他
    pub location: Option<String>,
}

/// 发票汇总 (ResumenFactura), 金额保持原始字符串
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub currency_code: Option<String>,
    pub exchange_rate: Option<String>,
    pub total_sale: Option<String>,
    pub total_discounts: Option<String>,
    pub net_sale: Option<String>,
    pub total_taxed_goods: Option<String>,
    pub total_taxed: Option<String>,
    pub other_charges: Option<String>,
    pub total_tax: Option<String>,
    pub total_document: Option<String>,
    pub payment_methods: Vec<PaymentMethod>,
    pub tax_breakdown: Vec<TaxBreakdownLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub type_code: Option<String>,
    pub other_text: Option<String>,
    pub total: Option<String>,
}

/// 税额分解行: (税种, 税率代码) -> 税额
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdownLine {
    pub tax_code: Option<String>,
    pub tax_rate_code: Option<String>,
    pub rate_percent: Option<String>,
    pub tax_amount: Option<String>,
}
