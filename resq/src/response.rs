use crate::event::ProcessingEvent;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// 消费请求结果枚举
#[derive(Debug, PartialEq)]
pub enum ConsumeResponse {
    /// 消费完成，事件可能为空
    Consumed(Vec<ProcessingEvent>),
    /// 核心之外的内部错误
    Internal(String),
}

impl std::fmt::Display for ConsumeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsumeResponse::Consumed(events) => write!(f, "消费 {} 条处理结果", events.len()),
            ConsumeResponse::Internal(details) => write!(f, "消费结果流失败：{details}"),
        }
    }
}

impl IntoResponse for ConsumeResponse {
    fn into_response(self) -> Response {
        match self {
            ConsumeResponse::Consumed(events) => (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": "视频处理结果消费成功",
                    "events": events,
                })),
            )
                .into_response(),
            ConsumeResponse::Internal(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "消费结果流失败",
                    "details": details,
                })),
            )
                .into_response(),
        }
    }
}
