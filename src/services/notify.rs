//! 用户通知（fire-and-forget）

use async_trait::async_trait;
use serde::Serialize;

use crate::core::CollaboratorError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_user(
        &self,
        user_id: &str,
        notification: &Notification,
    ) -> Result<(), CollaboratorError>;
}

/// 只写日志的通知实现
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify_user(
        &self,
        user_id: &str,
        notification: &Notification,
    ) -> Result<(), CollaboratorError> {
        tracing::info!(
            user = %user_id,
            title = %notification.title,
            "{}",
            notification.message
        );
        Ok(())
    }
}
