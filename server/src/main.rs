mod handlers;
mod routes;

use tracing::{error, info, warn};
use tracing_appender::non_blocking;
use tracing_subscriber::fmt;

#[tokio::main]
async fn main() {
    let (non_blocking, _guard) = non_blocking(std::io::stdout());
    fmt()
        .with_writer(non_blocking)
        .with_target(false)
        .pretty()
        .init();

    let consumer = match resq_redis::consumer().await {
        Ok(c) => c,
        Err(e) => {
            error!("创建结果流消费者失败：{e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = consumer.ensure_group().await {
        warn!("启动时初始化消费组失败，首次消费时重试：{e}");
    }

    let app = routes::consume_routes().with_state(consumer.clone());
    let addr = std::env::var("RESQ_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("监听 {addr} 失败：{e}");
            std::process::exit(1);
        }
    };
    let cfg = consumer.config();
    info!(
        stream = %cfg.result_stream_key,
        group = %cfg.consumer_group,
        "开始监听 {addr}"
    );
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown())
        .await
    {
        error!("服务异常退出：{e}");
    }
}

async fn shutdown() {
    match tokio::signal::ctrl_c().await {
        Ok(_) => info!("收到 Ctrl-C 信号，开始优雅退出"),
        Err(e) => error!("监听 Ctrl-C 信号失败: {e}"),
    }
}
