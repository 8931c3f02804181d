use crate::handlers;
use axum::{Router, routing::post};
use resq::{Consumer, domain::Broker};
use std::sync::Arc;

pub fn consume_routes<B: Broker>() -> Router<Arc<Consumer<B>>> {
    Router::new().route("/api/consume", post(handlers::consume::<B>))
}
