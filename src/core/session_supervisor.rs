//! 请求监管：单次请求的取消令牌与截止时间
//!
//! 持有 CancellationToken；到达截止时间或外部取消（父 token）时触发，尚未启动的子任务据此产出 Cancelled。

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// 请求级生命周期管理
#[derive(Debug)]
pub struct SessionSupervisor {
    cancel_token: CancellationToken,
    /// 超时计时任务，请求结束时中止
    deadline: Option<JoinHandle<()>>,
}

impl SessionSupervisor {
    /// 独立请求（不受外部取消影响）
    pub fn new(timeout: Option<Duration>) -> Self {
        Self::with_parent(&CancellationToken::new(), timeout)
    }

    /// 父 token 取消时本请求一并取消（如服务关闭）
    pub fn with_parent(parent: &CancellationToken, timeout: Option<Duration>) -> Self {
        let cancel_token = parent.child_token();
        let deadline = timeout.filter(|t| !t.is_zero()).map(|t| {
            let token = cancel_token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(t) => {
                        tracing::warn!(timeout_ms = t.as_millis() as u64, "request deadline reached, cancelling");
                        token.cancel();
                    }
                    _ = token.cancelled() => {}
                }
            })
        });
        Self {
            cancel_token,
            deadline,
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl Drop for SessionSupervisor {
    fn drop(&mut self) {
        if let Some(handle) = self.deadline.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_cancels() {
        let sup = SessionSupervisor::new(Some(Duration::from_millis(10)));
        let token = sup.cancel_token();
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
        assert!(sup.is_cancelled());
    }

    #[tokio::test]
    async fn test_parent_cancel_propagates() {
        let parent = CancellationToken::new();
        let sup = SessionSupervisor::with_parent(&parent, None);
        assert!(!sup.is_cancelled());
        parent.cancel();
        assert!(sup.is_cancelled());
    }

    #[tokio::test]
    async fn test_zero_timeout_means_unbounded() {
        let sup = SessionSupervisor::new(Some(Duration::ZERO));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!sup.is_cancelled());
    }
}
