use thiserror::Error;

/// 文档解析错误 (XML 不合法或缺少根元素)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Syntax(String),
    #[error("document has no root element")]
    NoRoot,
    #[error("root element <{0}> is never closed")]
    Unclosed(String),
    #[error("document has more than one root element")]
    MultipleRoots,
}

/// 存储层错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invoice store unavailable: {0}")]
    Unavailable(String),
    #[error("store query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// 导出错误: 前置条件失败 / 渲染失败 / 存储失败
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no documents to export")]
    NoDocuments,
    #[error("{count} receivers in the working set ({}), export needs exactly one", receivers.join(", "))]
    MultipleReceivers { count: usize, receivers: Vec<String> },
    #[error("{0} documents missing category")]
    MissingCategory(usize),
    #[error("stored document {file_name} cannot be parsed: {source}")]
    Document {
        file_name: String,
        #[source]
        source: ParseError,
    },
    #[error("export rendering failed: {0}")]
    Render(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 费用类别目录加载错误
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read expense catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid expense catalog: {0}")]
    Json(#[from] serde_json::Error),
}
