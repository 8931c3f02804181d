use axum::extract::State;
use resq::{ConsumeResponse, Consumer, domain::Broker};
use std::sync::Arc;
use tracing::error;

/// 消费一批视频处理结果
///
/// 消费在独立任务中执行，任务崩溃映射为内部错误。
pub async fn consume<B: Broker>(State(consumer): State<Arc<Consumer<B>>>) -> ConsumeResponse {
    let task = tokio::spawn(async move { consumer.consume().await });
    match task.await {
        Ok(events) => ConsumeResponse::Consumed(events),
        Err(e) => {
            error!("消费任务异常：{e}");
            ConsumeResponse::Internal(e.to_string())
        }
    }
}
