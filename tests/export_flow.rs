use einvoice_export_rust::export::ExportFormat;
use einvoice_export_rust::models::{CatalogEntry, ExpenseCatalog, ReversalPolicy};
use einvoice_export_rust::service::{ExportRequest, IncomingFile, IngestResult};
use einvoice_export_rust::{
    AggregationEngine, ExportService, IngestionPipeline, InvoiceStore, InvoiceWorkspace,
    MemoryStore, SqliteStore,
};
use std::sync::Arc;

fn document(root: &str, consecutive: &str, total: &str, tax: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<{root} xmlns="https://cdn.comprobanteselectronicos.go.cr/xml-schemas/v4.4/{root}">
  <Clave>5060101240031012345670010000101000000{consecutive}1</Clave>
  <NumeroConsecutivo>00100001010000000{consecutive}</NumeroConsecutivo>
  <FechaEmision>2024-05-0{consecutive}T10:00:00-06:00</FechaEmision>
  <Emisor>
    <Nombre>Distribuidora Ñandú S.A.</Nombre>
    <Identificacion><Tipo>02</Tipo><Numero>3101234567</Numero></Identificacion>
  </Emisor>
  <Receptor>
    <Nombre>Consultores del Valle</Nombre>
    <Identificacion><Tipo>02</Tipo><Numero>3102987654</Numero></Identificacion>
  </Receptor>
  <ResumenFactura>
    <CodigoTipoMoneda><CodigoMoneda>CRC</CodigoMoneda><TipoCambio>1.00000</TipoCambio></CodigoTipoMoneda>
    <TotalVenta>100.00</TotalVenta>
    <TotalDescuentos>0.00</TotalDescuentos>
    <TotalVentaNeta>100.00</TotalVentaNeta>
    <TotalDesgloseImpuesto>
      <Codigo>01</Codigo>
      <CodigoTarifaIVA>08</CodigoTarifaIVA>
      <TotalMontoImpuesto>{tax}</TotalMontoImpuesto>
    </TotalDesgloseImpuesto>
    <TotalImpuesto>{tax}</TotalImpuesto>
    <TotalComprobante>{total}</TotalComprobante>
  </ResumenFactura>
</{root}>"#,
        root = root,
        consecutive = consecutive,
        total = total,
        tax = tax,
    )
}

fn catalog() -> ExpenseCatalog {
    ExpenseCatalog::new(vec![
        CatalogEntry {
            code: "01".to_string(),
            name: "Alquiler".to_string(),
            account: Some("5-01-01".to_string()),
        },
        CatalogEntry {
            code: "02".to_string(),
            name: "Combustible".to_string(),
            account: None,
        },
    ])
}

#[tokio::test]
async fn ingest_classify_export_and_clear() {
    let out = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let pipeline = IngestionPipeline::new(store.clone());
    let workspace = InvoiceWorkspace::new(store.clone());
    let engine = AggregationEngine::new(&catalog(), ReversalPolicy::default());
    let exporter = ExportService::new(store.clone(), engine, out.path());

    let files = vec![
        IncomingFile::new("fe1.xml", document("FacturaElectronica", "1", "113.00", "13.00")),
        IncomingFile::new("fe2.xml", document("FacturaElectronica", "2", "226.00", "26.00")),
        IncomingFile::new("nc1.xml", document("NotaCreditoElectronica", "3", "56.50", "6.50")),
        IncomingFile::new("fe1.xml", document("FacturaElectronica", "1", "113.00", "13.00")),
        IncomingFile::new("notas.txt", "hola"),
    ];
    let report = pipeline.ingest_batch(&files, |_| {}).await.unwrap();
    assert_eq!((report.added, report.duplicates, report.invalid), (3, 1, 1));
    assert_eq!(report.results[3].result, IngestResult::Duplicate);

    workspace.set_category("fe1.xml", Some("01")).await.unwrap();
    workspace.set_category("fe2.xml", Some("02")).await.unwrap();
    workspace.set_category("nc1.xml", Some("01")).await.unwrap();

    let groups = workspace.receiver_groups().await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].receiver_id, "3102987654");

    let outcome = exporter
        .export_and_clear(ExportRequest {
            format: ExportFormat::Csv,
            allow_missing_category: false,
            file_name: None,
        })
        .await
        .unwrap();

    assert_eq!(outcome.document_count, 3);
    assert_eq!(outcome.net_total, "CRC 282.50");
    assert_eq!(outcome.summary.reversal.get("CRC").to_string(), "56.50");
    assert!(outcome
        .path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("gastos_3102987654_"));

    let text = std::fs::read_to_string(&outcome.path).unwrap();
    assert!(text.contains("IVA 13% (01/08)"));
    assert!(text.contains("Subtotal Alquiler (01)"));
    assert!(text.contains("-56.50"));
    assert!(text.contains("TOTAL GENERAL"));

    assert!(store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_store_survives_failed_export() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(&dir.path().join("invoices.db")).await.unwrap());
    let pipeline = IngestionPipeline::new(store.clone());
    let engine = AggregationEngine::new(&catalog(), ReversalPolicy::default());
    let exporter = ExportService::new(store.clone(), engine, dir.path().join("out"));

    let result = pipeline
        .ingest("fe1.xml", &document("FacturaElectronica", "1", "113.00", "13.00"))
        .await
        .unwrap();
    assert_eq!(result, IngestResult::Added);

    let err = exporter
        .export_and_clear(ExportRequest {
            format: ExportFormat::Pdf,
            allow_missing_category: false,
            file_name: Some("reporte".to_string()),
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "1 documents missing category");
    assert!(store.has("fe1.xml").await.unwrap());

    let outcome = exporter
        .export_and_clear(ExportRequest {
            format: ExportFormat::Pdf,
            allow_missing_category: true,
            file_name: Some("reporte".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(outcome.path, dir.path().join("out").join("reporte.pdf"));
    assert!(store.list_all().await.unwrap().is_empty());
}
