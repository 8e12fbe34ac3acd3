//! ULCS HTTP 服务
//!
//! 启动: cargo run --bin ulcs-server
//! 请求: curl -X POST http://127.0.0.1:3000/api/command -d '{"prompt":"Remind me to call Bob tomorrow"}'

use std::sync::Arc;

use anyhow::Context;

use ulcs::config::load_config_or_default;
use ulcs::core::{build_orchestrator, ShutdownManager};
use ulcs::integrations::http::{create_router, HttpState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ulcs::observability::init();

    let cfg = load_config_or_default(std::env::var("ULCS_CONFIG").ok().map(Into::into));
    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let orchestrator = build_orchestrator(&cfg)?.with_shutdown(shutdown.token());
    let app = create_router(Arc::new(HttpState {
        orchestrator: Arc::new(orchestrator),
        default_user_id: cfg.app.default_user_id.clone(),
    }));

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.bind))?;
    tracing::info!("ULCS server listening on http://{}", cfg.server.bind);

    let signal = Arc::clone(&shutdown);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.wait_for_shutdown().await })
        .await?;
    tracing::info!("ULCS server stopped");
    Ok(())
}
