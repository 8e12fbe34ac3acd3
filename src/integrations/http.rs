//! HTTP 入口
//!
//! POST /api/command 接收 `{prompt, userId?}`，返回 `{result}`；GET /api/analytics/:user_id 返回使用统计。
//! 请求体按字节读取后自行解析，保证任何不合法的请求体都得到统一的 400 响应。

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::Orchestrator;

/// HTTP 服务状态
pub struct HttpState {
    pub orchestrator: Arc<Orchestrator>,
    /// 请求未带 userId 时使用
    pub default_user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub result: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// 创建 HTTP 路由
pub fn create_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route(
            "/api/command",
            post(api_command).fallback(method_not_allowed),
        )
        .route("/api/analytics/:user_id", get(api_analytics))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

async fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

async fn api_command(State(state): State<Arc<HttpState>>, body: Bytes) -> Response {
    let req: CommandRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable command body");
            return error_response(StatusCode::BAD_REQUEST, "Missing prompt");
        }
    };
    let Some(prompt) = req.prompt.filter(|p| !p.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "Missing prompt");
    };
    let user_id = req
        .user_id
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| state.default_user_id.clone());

    let report = state.orchestrator.handle_command(&prompt, &user_id).await;
    (
        StatusCode::OK,
        Json(CommandResponse {
            result: report.render(),
        }),
    )
        .into_response()
}

async fn api_analytics(
    State(state): State<Arc<HttpState>>,
    Path(user_id): Path<String>,
) -> Response {
    match state.orchestrator.analytics_dashboard(&user_id).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "analytics lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    use crate::services::Services;
    use crate::skills::SkillRegistry;

    fn router() -> Router {
        let orchestrator = Orchestrator::new(Arc::new(SkillRegistry::builder().build()), Services::offline());
        create_router(Arc::new(HttpState {
            orchestrator: Arc::new(orchestrator),
            default_user_id: "default_user".to_string(),
        }))
    }

    async fn call(method: Method, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = router().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_missing_prompt_is_400() {
        for body in ["{}", r#"{"prompt": "   "}"#, "not json", ""] {
            let (status, value) = call(Method::POST, "/api/command", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(value["error"], "Missing prompt");
        }
    }

    #[tokio::test]
    async fn test_get_is_405() {
        let (status, value) = call(Method::GET, "/api/command", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(value["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_command_returns_result() {
        let (status, value) = call(
            Method::POST,
            "/api/command",
            r#"{"prompt": "write a haiku", "userId": "alice"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let result = value["result"].as_str().unwrap();
        assert!(result.contains("🛠️ Auto-generated tool for"));
        assert!(result.contains("🧠 Emotion:"));
    }

    #[tokio::test]
    async fn test_analytics_endpoint() {
        let (status, value) = call(Method::GET, "/api/analytics/nobody", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["user_id"], "nobody");
        assert_eq!(value["requests"], 0);
    }
}
