use serde::{Deserialize, Serialize};

/// 信用票据 (Nota de crédito) 的类型代码
pub const CREDIT_NOTE_CODE: &str = "03";

/// 根元素名 -> (类型代码, 名称)
const DOCUMENT_TYPES: &[(&str, &str, &str)] = &[
    ("FacturaElectronica", "01", "Factura electrónica"),
    ("NotaDebitoElectronica", "02", "Nota de débito"),
    ("NotaCreditoElectronica", "03", "Nota de crédito"),
    ("TiqueteElectronico", "04", "Tiquete electrónico"),
    ("MensajeReceptor", "05", "Mensaje receptor"),
    ("FacturaElectronicaCompra", "08", "Factura de compra"),
    ("FacturaElectronicaExportacion", "09", "Factura de exportación"),
    ("ReciboElectronicoPago", "10", "Recibo de pago"),
];

/// 根据根元素本地名推断类型; 未知时返回 (None, 原始名)
pub fn infer_document_type(root_local_name: &str) -> (Option<String>, String) {
    DOCUMENT_TYPES
        .iter()
        .find(|(root, _, _)| *root == root_local_name)
        .map(|(_, code, label)| (Some(code.to_string()), label.to_string()))
        .unwrap_or_else(|| (None, root_local_name.to_string()))
}

/// 冲红判定: 哪些类型代码的金额需要取反
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalPolicy {
    codes: Vec<String>,
}

impl ReversalPolicy {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_reversal(&self, document_type_code: Option<&str>) -> bool {
        document_type_code
            .map(|code| self.codes.iter().any(|c| c == code))
            .unwrap_or(false)
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }
}

impl Default for ReversalPolicy {
    fn default() -> Self {
        Self::new([CREDIT_NOTE_CODE])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_roots_map_to_codes() {
        assert_eq!(
            infer_document_type("NotaCreditoElectronica"),
            (Some("03".to_string()), "Nota de crédito".to_string())
        );
        assert_eq!(infer_document_type("FacturaElectronica").0.as_deref(), Some("01"));
    }

    #[test]
    fn unknown_root_keeps_raw_name() {
        assert_eq!(
            infer_document_type("FacturaRara"),
            (None, "FacturaRara".to_string())
        );
    }

    #[test]
    fn reversal_policy_defaults_to_credit_notes() {
        let policy = ReversalPolicy::default();
        assert!(policy.is_reversal(Some("03")));
        assert!(!policy.is_reversal(Some("01")));
        assert!(!policy.is_reversal(None));

        let extended = ReversalPolicy::new(["03", "99"]);
        assert!(extended.is_reversal(Some("99")));
    }
}
