//! 任务与结果
//!
//! Task 带批次内序号；Outcome 是每个任务的终态记录，渲染只发生在 Report 聚合时。

use serde::Serialize;

use crate::core::SkillFailure;
use crate::services::ArtifactDescriptor;

/// 一次请求中的单个子任务；index 决定报告中的顺序
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub index: usize,
    pub text: String,
}

impl Task {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// 单个任务的状态机阶段：Pending -> Resolving -> Resolved | Unresolved -> Executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Pending,
    Resolving,
    Resolved,
    Unresolved,
    Executed,
}

/// 单个任务的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 技能命中并执行成功
    Success {
        intent: String,
        skill_id: String,
        text: String,
    },
    /// 技能命中但执行失败（含缺少执行能力的配置缺陷）
    SkillError {
        skill_id: String,
        error: SkillFailure,
    },
    /// 无匹配技能，走降级生成
    NoSkillFallback {
        intent: String,
        text: String,
        artifact: Option<ArtifactDescriptor>,
    },
    /// 请求已取消，任务未启动
    Cancelled,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::SkillError { .. })
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::NoSkillFallback { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// 渲染为报告中的一行（降级结果为两段，以空行连接）
    pub fn render(&self) -> String {
        match self {
            Outcome::Success { intent, text, .. } => format!("✅ [{}]: {}", intent, text),
            Outcome::SkillError { skill_id, error } => format!("❌ [{}]: {}", skill_id, error),
            Outcome::NoSkillFallback { intent, text, .. } => format!(
                "{}\n\n🛠️ Auto-generated tool for \"{}\" created.",
                text, intent
            ),
            Outcome::Cancelled => "⏹️ Task cancelled before it started.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_variants() {
        let ok = Outcome::Success {
            intent: "schedule".into(),
            skill_id: "schedule_reminder".into(),
            text: "done".into(),
        };
        assert_eq!(ok.render(), "✅ [schedule]: done");

        let err = Outcome::SkillError {
            skill_id: "broken".into(),
            error: SkillFailure::MissingCapability,
        };
        let line = err.render();
        assert!(line.starts_with("❌"));
        assert!(line.contains("broken"));

        let fb = Outcome::NoSkillFallback {
            intent: "write poem".into(),
            text: "Here is a poem".into(),
            artifact: None,
        };
        assert!(fb.render().contains("Auto-generated tool for \"write poem\""));
        assert!(fb.is_fallback());
    }
}
