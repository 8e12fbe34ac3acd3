//! 错误类型
//!
//! 三层：SkillFailure（单个任务，渲染为失败行，批次继续）、CollaboratorError（外部服务故障，
//! 在调用点降级）、OrchestratorError（拆分/翻译等批次级故障，由顶层守卫渲染为单行错误报告）。

use thiserror::Error;

/// 单个技能执行失败的原因；保留类型以便测试与日志区分
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkillFailure {
    /// 注册项没有可执行能力（配置缺陷，必须在报告中显式呈现）
    #[error("No execute() capability")]
    MissingCapability,

    #[error("{0}")]
    Execution(String),

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("panicked: {0}")]
    Panicked(String),
}

/// 外部协作服务（翻译、拆分、记忆、日志、通知、生成等）的故障
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{service} failed: {message}")]
pub struct CollaboratorError {
    pub service: &'static str,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
        }
    }
}

/// 批次级故障：不属于任何单个任务，整个请求降级为一行错误文本
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("Empty input")]
    EmptyInput,

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("Request cancelled")]
    Cancelled,

    /// 流水线内部 panic（由顶层守卫捕获）
    #[error("Internal fault: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_error_display() {
        let err = CollaboratorError::new("translate", "connection reset");
        assert_eq!(err.to_string(), "translate failed: connection reset");

        let fatal: OrchestratorError = err.into();
        assert_eq!(fatal.to_string(), "translate failed: connection reset");
    }

    #[test]
    fn test_skill_failure_display() {
        assert_eq!(
            SkillFailure::MissingCapability.to_string(),
            "No execute() capability"
        );
        assert_eq!(SkillFailure::Timeout(500).to_string(), "timed out after 500ms");
    }
}
