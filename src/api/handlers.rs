use crate::api::AppState;
use crate::error::{ExportError, StoreError};
use crate::service::{ExportRequest, IncomingFile};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// 请求体: 批量上传
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub files: Vec<IncomingFile>,
}

/// 请求体: 设置类别 (null 清除)
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveReceiverRequest {
    pub receiver_id: String,
}

/// 响应体
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

fn ok<T: Serialize>(message: impl Into<String>, data: Option<T>) -> Response {
    let response = ApiResponse {
        success: true,
        message: message.into(),
        data,
    };
    (StatusCode::OK, Json(response)).into_response()
}

fn fail(status: StatusCode, message: String) -> Response {
    let response: ApiResponse<()> = ApiResponse {
        success: false,
        message: format!("Error: {}", message),
        data: None,
    };
    (status, Json(response)).into_response()
}

fn store_failure(e: StoreError) -> Response {
    tracing::error!("存储操作失败: {}", e);
    fail(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
}

fn export_failure(e: ExportError) -> Response {
    let status = match &e {
        ExportError::NoDocuments
        | ExportError::MultipleReceivers { .. }
        | ExportError::MissingCategory(_) => StatusCode::CONFLICT,
        ExportError::Document { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ExportError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        ExportError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!("导出失败: {}", e);
    fail(status, e.to_string())
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 批量入库
pub async fn ingest(State(state): State<AppState>, Json(req): Json<IngestRequest>) -> Response {
    match state.pipeline.ingest_batch(&req.files, |_| {}).await {
        Ok(report) => ok(
            format!(
                "{} added, {} duplicates, {} invalid",
                report.added, report.duplicates, report.invalid
            ),
            Some(report),
        ),
        Err(e) => store_failure(e),
    }
}

/// 工作集列表
pub async fn list_invoices(State(state): State<AppState>) -> Response {
    match state.workspace.documents().await {
        Ok(documents) => ok(format!("{} documents", documents.len()), Some(documents)),
        Err(e) => store_failure(e),
    }
}

pub async fn clear_invoices(State(state): State<AppState>) -> Response {
    match state.workspace.clear().await {
        Ok(()) => ok::<()>("Workspace cleared", None),
        Err(e) => store_failure(e),
    }
}

pub async fn set_category(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
    Json(req): Json<CategoryRequest>,
) -> Response {
    match state
        .workspace
        .set_category(&file_name, req.category.as_deref())
        .await
    {
        Ok(()) => ok::<()>(format!("Category updated for {}", file_name), None),
        Err(e) => store_failure(e),
    }
}

pub async fn remove_invoice(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Response {
    match state.workspace.remove(&file_name).await {
        Ok(()) => ok::<()>(format!("Removed {}", file_name), None),
        Err(e) => store_failure(e),
    }
}

/// 收票方分组
pub async fn list_receivers(State(state): State<AppState>) -> Response {
    match state.workspace.receiver_groups().await {
        Ok(groups) => ok(format!("{} receivers", groups.len()), Some(groups)),
        Err(e) => store_failure(e),
    }
}

pub async fn remove_receiver(
    State(state): State<AppState>,
    Json(req): Json<RemoveReceiverRequest>,
) -> Response {
    match state
        .workspace
        .remove_receiver_group(&req.receiver_id, |_| {})
        .await
    {
        Ok(report) => ok(
            format!(
                "Removed {} documents, {} failed",
                report.removed.len(),
                report.failed.len()
            ),
            Some(report),
        ),
        Err(e) => store_failure(e),
    }
}

/// 导出并清空工作集
pub async fn export(State(state): State<AppState>, Json(req): Json<ExportRequest>) -> Response {
    match state.exporter.export_and_clear(req).await {
        Ok(outcome) => ok(
            format!(
                "Exported {} documents to {}",
                outcome.document_count,
                outcome.path.display()
            ),
            Some(outcome),
        ),
        Err(e) => export_failure(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_failures_are_conflicts() {
        let response = export_failure(ExportError::MissingCategory(12));
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = export_failure(ExportError::Render("disk full".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = store_failure(StoreError::Unavailable("locked".to_string()));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
