//! 子任务拆分与意图提取
//!
//! RuleTaskExtractor：按连接词 / 分号 / 换行拆分，关键词规则提取意图（不调用 LLM）。
//! LlmTaskExtractor：交给 LLM，每行一个子任务 / 一个短意图标签。

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::core::CollaboratorError;
use crate::llm::{LlmClient, Message};

#[async_trait]
pub trait TaskExtractor: Send + Sync {
    /// 拆分子任务；无法拆分时可返回空列表（调用方把整句当作单个任务）
    async fn extract_sub_tasks(&self, text: &str) -> Result<Vec<String>, CollaboratorError>;

    async fn extract_intent(&self, task: &str) -> Result<String, CollaboratorError>;
}

/// 关键词 -> 意图；按顺序匹配，先命中者生效
const INTENT_RULES: &[(&[&str], &str)] = &[
    (&["remind me", "reminder", "schedule", "appointment"], "schedule"),
    (&["search", "find info", "look up", "research"], "web research"),
    (&["summarize", "summarise", "summary", "tl;dr"], "summarize"),
    (&["translate"], "translate"),
    (&["weather", "forecast"], "weather"),
];

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "to", "for", "of", "in", "on", "at", "and", "or", "me", "my", "i", "you",
    "your", "please", "can", "could", "would", "will", "should", "some", "it", "is", "are", "be",
    "with", "about", "this", "that", "what", "how", "do", "does", "us", "we",
];

/// 规则实现
pub struct RuleTaskExtractor {
    splitter: Regex,
}

impl RuleTaskExtractor {
    pub fn new() -> Self {
        // 固定模式，编译失败即为代码缺陷
        let splitter = Regex::new(r"(?i)\s*(?:;|\n|\band then\b|\band also\b|,?\s*\bthen\b)\s*")
            .expect("valid sub-task splitter pattern");
        Self { splitter }
    }

    fn split(&self, text: &str) -> Vec<String> {
        self.splitter
            .split(text)
            .map(|s| s.trim().trim_end_matches(['.', ',']).trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// 规则意图：关键词表优先，否则取前两个非停用词
    pub fn rule_intent(task: &str) -> String {
        let lower = task.to_lowercase();
        for (keywords, intent) in INTENT_RULES {
            if keywords.iter().any(|k| lower.contains(k)) {
                return (*intent).to_string();
            }
        }
        let words: Vec<String> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty() && !STOPWORDS.contains(w))
            .take(2)
            .map(str::to_string)
            .collect();
        if words.is_empty() {
            "general".to_string()
        } else {
            words.join(" ")
        }
    }
}

impl Default for RuleTaskExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskExtractor for RuleTaskExtractor {
    async fn extract_sub_tasks(&self, text: &str) -> Result<Vec<String>, CollaboratorError> {
        let parts = self.split(text);
        // 只有一段时交给调用方的「整句即任务」规则
        if parts.len() <= 1 {
            return Ok(Vec::new());
        }
        Ok(parts)
    }

    async fn extract_intent(&self, task: &str) -> Result<String, CollaboratorError> {
        Ok(Self::rule_intent(task))
    }
}

/// LLM 实现
pub struct LlmTaskExtractor {
    llm: Arc<dyn LlmClient>,
}

impl LlmTaskExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

/// 去掉 "1." / "-" / "*" 等列表前缀
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim();
        }
    }
    line
}

#[async_trait]
impl TaskExtractor for LlmTaskExtractor {
    async fn extract_sub_tasks(&self, text: &str) -> Result<Vec<String>, CollaboratorError> {
        let messages = vec![
            Message::system(
                "Split the user's request into independent sub-tasks. \
                 Output one sub-task per line, no numbering, no explanation. \
                 If the request is a single task, output it unchanged on one line.",
            ),
            Message::user(text.to_string()),
        ];
        let out = self
            .llm
            .complete(&messages)
            .await
            .map_err(|e| CollaboratorError::new("extract_sub_tasks", e))?;
        let tasks: Vec<String> = out
            .lines()
            .map(strip_list_marker)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        if tasks.len() <= 1 {
            return Ok(Vec::new());
        }
        Ok(tasks)
    }

    async fn extract_intent(&self, task: &str) -> Result<String, CollaboratorError> {
        let messages = vec![
            Message::system(
                "Classify the user's task with a short lowercase intent label of 1-3 words \
                 (e.g. 'schedule', 'web research', 'summarize', 'translate'). \
                 Output only the label.",
            ),
            Message::user(task.to_string()),
        ];
        let out = self
            .llm
            .complete(&messages)
            .await
            .map_err(|e| CollaboratorError::new("extract_intent", e))?;
        let label = out.lines().next().unwrap_or("").trim().to_lowercase();
        if label.is_empty() {
            Ok(RuleTaskExtractor::rule_intent(task))
        } else {
            Ok(label)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[tokio::test]
    async fn test_rule_split() {
        let ex = RuleTaskExtractor::new();
        let tasks = ex
            .extract_sub_tasks("Summarize this article and then remind me to read it; translate the title")
            .await
            .unwrap();
        assert_eq!(
            tasks,
            vec![
                "Summarize this article",
                "remind me to read it",
                "translate the title"
            ]
        );
    }

    #[tokio::test]
    async fn test_single_task_yields_empty() {
        let ex = RuleTaskExtractor::new();
        let tasks = ex
            .extract_sub_tasks("Remind me to call Bob tomorrow")
            .await
            .unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_rule_intent() {
        assert_eq!(RuleTaskExtractor::rule_intent("Remind me to call Bob tomorrow"), "schedule");
        assert_eq!(RuleTaskExtractor::rule_intent("search rust async"), "web research");
        assert_eq!(RuleTaskExtractor::rule_intent("Please write a poem about cats"), "write poem");
        assert_eq!(RuleTaskExtractor::rule_intent("?!"), "general");
    }

    #[test]
    fn test_strip_list_marker() {
        assert_eq!(strip_list_marker("1. buy milk"), "buy milk");
        assert_eq!(strip_list_marker("- call mom"), "call mom");
        assert_eq!(strip_list_marker("2) email Bob"), "email Bob");
        assert_eq!(strip_list_marker("42 is the answer"), "42 is the answer");
    }

    #[tokio::test]
    async fn test_llm_extractor_parses_lines() {
        let ex = LlmTaskExtractor::new(Arc::new(MockLlmClient::with_reply(
            "1. book a flight\n2. reserve a hotel\n",
        )));
        let tasks = ex.extract_sub_tasks("plan my trip").await.unwrap();
        assert_eq!(tasks, vec!["book a flight", "reserve a hotel"]);
    }
}
