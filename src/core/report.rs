//! 结果聚合
//!
//! 按任务顺序渲染 Outcome，追加建议列表与尾注（情绪、记忆提示、使用提示）。
//! Report 构建后不可变，由调用方持有。

use std::fmt;

use crate::core::{OrchestratorError, Outcome};

/// 报告尾注：始终追加，即使建议为空
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trailer {
    pub emotion: String,
    pub memory_hint: String,
    /// 高频意图的自动化提示
    pub auto_tip: Option<String>,
}

/// 一次请求的最终报告
#[derive(Debug, Clone)]
pub struct Report {
    outcomes: Vec<Outcome>,
    task_lines: Vec<String>,
    suggestions: Vec<String>,
    trailer: Trailer,
    fatal: Option<String>,
}

impl Report {
    /// 聚合有序 Outcome 与尾注
    pub fn aggregate(outcomes: Vec<Outcome>, suggestions: Vec<String>, trailer: Trailer) -> Self {
        let task_lines = outcomes.iter().map(Outcome::render).collect();
        Self {
            outcomes,
            task_lines,
            suggestions,
            trailer,
            fatal: None,
        }
    }

    /// 批次级故障：整个请求降级为单行错误
    pub fn fatal(err: &OrchestratorError) -> Self {
        Self {
            outcomes: Vec::new(),
            task_lines: vec![format!("❌ Error: {}", err)],
            suggestions: Vec::new(),
            trailer: Trailer::default(),
            fatal: Some(err.to_string()),
        }
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn task_lines(&self) -> &[String] {
        &self.task_lines
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }

    pub fn render(&self) -> String {
        if self.fatal.is_some() {
            return self.task_lines.join("\n");
        }

        let mut blocks: Vec<String> = self.task_lines.clone();
        if !self.suggestions.is_empty() {
            blocks.push("💡 Suggested Tools You Might Like:".to_string());
            blocks.extend(
                self.suggestions
                    .iter()
                    .enumerate()
                    .map(|(i, s)| format!("{}. {}", i + 1, s)),
            );
        }

        let mut trailer = format!(
            "🧠 Emotion: {}\n📎 Context: {}",
            self.trailer.emotion, self.trailer.memory_hint
        );
        if let Some(tip) = &self.trailer.auto_tip {
            trailer.push('\n');
            trailer.push_str(tip);
        }
        blocks.push(trailer);

        blocks.join("\n\n")
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SkillFailure;

    fn trailer() -> Trailer {
        Trailer {
            emotion: "neutral".into(),
            memory_hint: String::new(),
            auto_tip: None,
        }
    }

    #[test]
    fn test_aggregate_keeps_order_and_trailer() {
        let outcomes = vec![
            Outcome::Success {
                intent: "a".into(),
                skill_id: "a_skill".into(),
                text: "one".into(),
            },
            Outcome::SkillError {
                skill_id: "b_skill".into(),
                error: SkillFailure::Execution("boom".into()),
            },
        ];
        let report = Report::aggregate(outcomes, vec![], trailer());
        assert_eq!(report.task_lines().len(), 2);

        let text = report.render();
        assert!(text.starts_with("✅ [a]: one\n\n❌ [b_skill]: boom"));
        assert!(text.ends_with("🧠 Emotion: neutral\n📎 Context: "));
        assert!(!text.contains("Suggested"));
    }

    #[test]
    fn test_suggestions_numbered_before_trailer() {
        let report = Report::aggregate(
            vec![Outcome::Cancelled],
            vec!["summarize".into(), "web_research".into()],
            Trailer {
                auto_tip: Some("🔔 tip".into()),
                ..trailer()
            },
        );
        let text = report.render();
        let header = text.find("💡 Suggested Tools You Might Like:").unwrap();
        let first = text.find("1. summarize").unwrap();
        let second = text.find("2. web_research").unwrap();
        let emotion = text.find("🧠 Emotion").unwrap();
        assert!(header < first && first < second && second < emotion);
        assert!(text.ends_with("\n🔔 tip"));
    }

    #[test]
    fn test_fatal_report_single_line() {
        let report = Report::fatal(&OrchestratorError::EmptyInput);
        assert!(report.is_fatal());
        assert_eq!(report.render(), "❌ Error: Empty input");
        assert_eq!(report.task_lines().len(), 1);
    }
}
