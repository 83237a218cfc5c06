use crate::error::ParseError;
use crate::models::tax::rate_percent_for;
use crate::models::{
    infer_document_type, InvoiceRecord, Party, PaymentMethod, Summary, TaxBreakdownLine,
};
use crate::parser::tree::{parse_tree, XmlNode};
use crate::util::amount::{is_near_zero, parse_amount, to_fixed2};
use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexSet;
use std::collections::HashMap;

/// 解析电子发票 XML; 纯函数, 金额保持字符串
pub fn parse_document(raw_text: &str) -> Result<InvoiceRecord, ParseError> {
    let root = parse_tree(raw_text)?;
    let (document_type_code, document_type_label) = infer_document_type(&root.name);

    // 全文档扫描, 不限于明细行
    let transaction_type_codes: IndexSet<String> = root
        .find_all("TipoTransaccion")
        .into_iter()
        .filter_map(XmlNode::text)
        .map(str::to_string)
        .collect();

    Ok(InvoiceRecord {
        document_type_code,
        document_type_label,
        transaction_type_codes: transaction_type_codes.into_iter().collect(),
        key: root.text_of("Clave"),
        consecutive_number: root.text_of("NumeroConsecutivo"),
        issue_date: root.text_of("FechaEmision"),
        systems_provider: root.text_of("ProveedorSistemas"),
        issuer_activity_code: root
            .text_of("CodigoActividadEmisor")
            .or_else(|| root.text_of("CodigoActividad")),
        receiver_activity_code: root.text_of("CodigoActividadReceptor"),
        sale_condition: root.text_of("CondicionVenta"),
        sale_condition_other: root.text_of("CondicionVentaOtros"),
        issuer: root.find_first("Emisor").map(parse_party),
        receiver: root.find_first("Receptor").map(parse_party),
        summary: root
            .find_first("ResumenFactura")
            .map(|summary| parse_summary(&root, summary)),
    })
}

fn parse_party(node: &XmlNode) -> Party {
    let identification = node.find_first("Identificacion");
    Party {
        name: node.text_of("Nombre"),
        id_type: identification.and_then(|id| id.text_of("Tipo")),
        id_number: identification.and_then(|id| id.text_of("Numero")),
        trade_name: node.text_of("NombreComercial"),
        email: node.text_of("CorreoElectronico"),
        phone: node.find_first("Telefono").and_then(compose_phone),
        location: node.find_first("Ubicacion").and_then(compose_location),
    }
}

/// "CodigoPais NumTelefono"; 两者皆空时为 None
fn compose_phone(node: &XmlNode) -> Option<String> {
    join_present(&[node.text_of("CodigoPais"), node.text_of("NumTelefono")], " ")
}

fn compose_location(node: &XmlNode) -> Option<String> {
    let parts: Vec<Option<String>> = ["Provincia", "Canton", "Distrito", "Barrio", "OtrasSenas"]
        .iter()
        .map(|name| node.text_of(name))
        .collect();
    join_present(&parts, " - ")
}

fn join_present(parts: &[Option<String>], separator: &str) -> Option<String> {
    let present: Vec<&str> = parts.iter().flatten().map(String::as_str).collect();
    if present.is_empty() {
        None
    } else {
        Some(present.join(separator))
    }
}

fn parse_summary(root: &XmlNode, summary: &XmlNode) -> Summary {
    let rates = observed_rates(root);

    let tax_breakdown = summary
        .find_all("TotalDesgloseImpuesto")
        .into_iter()
        .map(|line| TaxBreakdownLine {
            tax_code: line.text_of("Codigo"),
            tax_rate_code: line.text_of("CodigoTarifaIVA"),
            rate_percent: line.text_of("Tarifa"),
            tax_amount: line.text_of("TotalMontoImpuesto"),
        })
        // 税额为零的分解行不参与导出
        .filter(|line| {
            !is_near_zero(&parse_amount(line.tax_amount.as_deref().unwrap_or("")))
        })
        .map(|mut line| {
            if line.rate_percent.is_none() {
                let pair = (
                    line.tax_code.clone().unwrap_or_default(),
                    line.tax_rate_code.clone().unwrap_or_default(),
                );
                line.rate_percent = rates.get(&pair).cloned().or_else(|| {
                    line.tax_rate_code
                        .as_deref()
                        .and_then(rate_percent_for)
                        .map(str::to_string)
                });
            }
            line
        })
        .collect();

    let payment_methods = summary
        .find_all("MedioPago")
        .into_iter()
        .map(|node| PaymentMethod {
            type_code: node.text_of("TipoMedioPago"),
            other_text: node.text_of("MedioPagoOtros"),
            total: node.text_of("TotalMedioPago"),
        })
        .collect();

    Summary {
        currency_code: summary.text_of("CodigoMoneda"),
        exchange_rate: summary.text_of("TipoCambio"),
        total_sale: summary.text_of("TotalVenta"),
        total_discounts: summary
            .text_of("TotalDescuentos")
            .or_else(|| fallback_discounts(root)),
        net_sale: summary.text_of("TotalVentaNeta"),
        total_taxed_goods: summary.text_of("TotalMercanciasGravadas"),
        total_taxed: summary.text_of("TotalGravado"),
        other_charges: summary.text_of("TotalOtrosCargos"),
        total_tax: summary.text_of("TotalImpuesto"),
        total_document: summary.text_of("TotalComprobante"),
        payment_methods,
        tax_breakdown,
    }
}

/// 文档中出现过的 (Codigo, CodigoTarifaIVA) -> Tarifa, 先出现者优先
fn observed_rates(root: &XmlNode) -> HashMap<(String, String), String> {
    let mut rates = HashMap::new();
    for tax in root.find_all("Impuesto") {
        let Some(rate) = tax.child("Tarifa").and_then(XmlNode::text) else {
            continue;
        };
        let code = tax.child("Codigo").and_then(XmlNode::text).unwrap_or("");
        let rate_code = tax
            .child("CodigoTarifaIVA")
            .and_then(XmlNode::text)
            .unwrap_or("");
        rates
            .entry((code.to_string(), rate_code.to_string()))
            .or_insert_with(|| rate.to_string());
    }
    rates
}

/// TotalDescuentos 缺失时的近似值: 累加全文所有 MontoDescuento.
/// 启发式结果, 不保证与开票方的合计一致.
fn fallback_discounts(root: &XmlNode) -> Option<String> {
    let nodes = root.find_all("MontoDescuento");
    if nodes.is_empty() {
        return None;
    }
    let sum = nodes
        .iter()
        .map(|node| parse_amount(node.text().unwrap_or("")))
        .fold(BigDecimal::zero(), |acc, v| acc + v);
    if is_near_zero(&sum) {
        Some("0.00".to_string())
    } else {
        Some(to_fixed2(&sum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVOICE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<FacturaElectronica xmlns="https://cdn.comprobanteselectronicos.go.cr/xml-schemas/v4.4/facturaElectronica">
  <Clave>50601012400310123456700100001010000000001100000001</Clave>
  <ProveedorSistemas>3101234567</ProveedorSistemas>
  <CodigoActividadEmisor>620100</CodigoActividadEmisor>
  <CodigoActividadReceptor>931201</CodigoActividadReceptor>
  <NumeroConsecutivo>00100001010000000001</NumeroConsecutivo>
  <FechaEmision>2024-01-15T10:30:00-06:00</FechaEmision>
  <Emisor>
    <Nombre>Servicios Técnicos SA</Nombre>
    <Identificacion><Tipo>02</Tipo><Numero>3101234567</Numero></Identificacion>
    <NombreComercial>ServiTec</NombreComercial>
    <Ubicacion>
      <Provincia>1</Provincia><Canton>01</Canton><Distrito>03</Distrito>
      <Barrio></Barrio><OtrasSenas>Frente al parque</OtrasSenas>
    </Ubicacion>
    <Telefono><CodigoPais>506</CodigoPais><NumTelefono>22223333</NumTelefono></Telefono>
    <CorreoElectronico>ventas@servitec.cr</CorreoElectronico>
  </Emisor>
  <Receptor>
    <Nombre>Cliente Corporativo SRL</Nombre>
    <Identificacion><Tipo>02</Tipo><Numero>3102987654</Numero></Identificacion>
    <Telefono><NumTelefono>88887777</NumTelefono></Telefono>
  </Receptor>
  <CondicionVenta>01</CondicionVenta>
  <DetalleServicio>
    <LineaDetalle>
      <NumeroLinea>1</NumeroLinea>
      <TipoTransaccion>01</TipoTransaccion>
      <Descuento><MontoDescuento>5.00</MontoDescuento></Descuento>
      <Impuesto><Codigo>01</Codigo><CodigoTarifaIVA>08</CodigoTarifaIVA><Tarifa>13.00</Tarifa><Monto>13.00</Monto></Impuesto>
    </LineaDetalle>
    <LineaDetalle>
      <NumeroLinea>2</NumeroLinea>
      <TipoTransaccion>04</TipoTransaccion>
      <Descuento><MontoDescuento>2.50</MontoDescuento></Descuento>
      <Impuesto><Codigo>01</Codigo><CodigoTarifaIVA>04</CodigoTarifaIVA><Tarifa>4.00</Tarifa><Monto>0.00</Monto></Impuesto>
    </LineaDetalle>
    <LineaDetalle>
      <TipoTransaccion>01</TipoTransaccion>
    </LineaDetalle>
  </DetalleServicio>
  <ResumenFactura>
    <CodigoTipoMoneda><CodigoMoneda>CRC</CodigoMoneda><TipoCambio>1.00000</TipoCambio></CodigoTipoMoneda>
    <TotalVenta>107.50</TotalVenta>
    <TotalVentaNeta>100.00</TotalVentaNeta>
    <TotalDesgloseImpuesto><Codigo>01</Codigo><CodigoTarifaIVA>08</CodigoTarifaIVA><TotalMontoImpuesto>13.00</TotalMontoImpuesto></TotalDesgloseImpuesto>
    <TotalDesgloseImpuesto><Codigo>01</Codigo><CodigoTarifaIVA>04</CodigoTarifaIVA><TotalMontoImpuesto>0.00</TotalMontoImpuesto></TotalDesgloseImpuesto>
    <TotalImpuesto>13.00</TotalImpuesto>
    <MedioPago><TipoMedioPago>04</TipoMedioPago><TotalMedioPago>100.00</TotalMedioPago></MedioPago>
    <MedioPago><TipoMedioPago>99</TipoMedioPago><MedioPagoOtros>Cupón</MedioPagoOtros><TotalMedioPago>13.00</TotalMedioPago></MedioPago>
    <TotalComprobante>113.00</TotalComprobante>
  </ResumenFactura>
</FacturaElectronica>"#;

    #[test]
    fn reads_header_fields() {
        let record = parse_document(INVOICE).unwrap();
        assert_eq!(record.document_type_code.as_deref(), Some("01"));
        assert_eq!(record.document_type_label, "Factura electrónica");
        assert_eq!(record.consecutive_number.as_deref(), Some("00100001010000000001"));
        assert_eq!(record.issue_date.as_deref(), Some("2024-01-15T10:30:00-06:00"));
        assert_eq!(record.issuer_activity_code.as_deref(), Some("620100"));
        assert_eq!(record.receiver_activity_code.as_deref(), Some("931201"));
        assert_eq!(record.sale_condition.as_deref(), Some("01"));
        assert_eq!(record.sale_condition_other, None);
    }

    #[test]
    fn collects_distinct_transaction_types_in_order() {
        let record = parse_document(INVOICE).unwrap();
        assert_eq!(record.transaction_type_codes, vec!["01", "04"]);
    }

    #[test]
    fn composes_party_phone_and_location() {
        let record = parse_document(INVOICE).unwrap();
        let issuer = record.issuer.unwrap();
        assert_eq!(issuer.name.as_deref(), Some("Servicios Técnicos SA"));
        assert_eq!(issuer.id_type.as_deref(), Some("02"));
        assert_eq!(issuer.phone.as_deref(), Some("506 22223333"));
        assert_eq!(issuer.location.as_deref(), Some("1 - 01 - 03 - Frente al parque"));
        assert_eq!(issuer.email.as_deref(), Some("ventas@servitec.cr"));

        let receiver = record.receiver.unwrap();
        assert_eq!(receiver.id_number.as_deref(), Some("3102987654"));
        assert_eq!(receiver.phone.as_deref(), Some("88887777"));
        assert_eq!(receiver.location, None);
    }

    #[test]
    fn discount_total_falls_back_to_line_discounts() {
        let summary = parse_document(INVOICE).unwrap().summary.unwrap();
        assert_eq!(summary.total_discounts.as_deref(), Some("7.50"));
    }

    #[test]
    fn discount_fallback_zero_and_absent() {
        let zero = "<FacturaElectronica><Descuento><MontoDescuento>0.00</MontoDescuento></Descuento>\
                    <ResumenFactura><TotalComprobante>1</TotalComprobante></ResumenFactura></FacturaElectronica>";
        let summary = parse_document(zero).unwrap().summary.unwrap();
        assert_eq!(summary.total_discounts.as_deref(), Some("0.00"));

        let none = "<FacturaElectronica><ResumenFactura><TotalComprobante>1</TotalComprobante></ResumenFactura></FacturaElectronica>";
        let summary = parse_document(none).unwrap().summary.unwrap();
        assert_eq!(summary.total_discounts, None);
    }

    #[test]
    fn direct_discount_total_wins() {
        let xml = "<FacturaElectronica><MontoDescuento>9</MontoDescuento>\
                   <ResumenFactura><TotalDescuentos>1.25</TotalDescuentos></ResumenFactura></FacturaElectronica>";
        let summary = parse_document(xml).unwrap().summary.unwrap();
        assert_eq!(summary.total_discounts.as_deref(), Some("1.25"));
    }

    #[test]
    fn zero_tax_lines_are_dropped_and_rates_backfilled() {
        let summary = parse_document(INVOICE).unwrap().summary.unwrap();
        assert_eq!(summary.tax_breakdown.len(), 1);
        let line = &summary.tax_breakdown[0];
        assert_eq!(line.tax_code.as_deref(), Some("01"));
        assert_eq!(line.tax_rate_code.as_deref(), Some("08"));
        assert_eq!(line.rate_percent.as_deref(), Some("13.00"));
        assert_eq!(line.tax_amount.as_deref(), Some("13.00"));
    }

    #[test]
    fn payment_methods_keep_document_order() {
        let summary = parse_document(INVOICE).unwrap().summary.unwrap();
        assert_eq!(summary.payment_methods.len(), 2);
        assert_eq!(summary.payment_methods[0].type_code.as_deref(), Some("04"));
        assert_eq!(summary.payment_methods[1].other_text.as_deref(), Some("Cupón"));
        assert_eq!(summary.currency_code.as_deref(), Some("CRC"));
        assert_eq!(summary.exchange_rate.as_deref(), Some("1.00000"));
        assert_eq!(summary.total_document.as_deref(), Some("113.00"));
    }

    #[test]
    fn credit_note_root_is_recognized() {
        let xml = INVOICE.replace("FacturaElectronica", "NotaCreditoElectronica");
        let record = parse_document(&xml).unwrap();
        assert_eq!(record.document_type_code.as_deref(), Some("03"));
    }

    #[test]
    fn unknown_root_keeps_its_name() {
        let record = parse_document("<DocumentoRaro><Clave>1</Clave></DocumentoRaro>").unwrap();
        assert_eq!(record.document_type_code, None);
        assert_eq!(record.document_type_label, "DocumentoRaro");
        assert_eq!(record.summary, None);
        assert_eq!(record.issuer, None);
    }

    #[test]
    fn parsing_is_deterministic() {
        assert_eq!(parse_document(INVOICE).unwrap(), parse_document(INVOICE).unwrap());
    }

    #[test]
    fn malformed_text_is_rejected() {
        assert!(parse_document("not xml at all").is_err());
        assert!(parse_document("<FacturaElectronica><Clave>1</FacturaElectronica>").is_err());
    }
}
