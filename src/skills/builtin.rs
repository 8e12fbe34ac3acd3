//! 内置技能：web_research / summarize / schedule_reminder
//!
//! 先于清单技能注册，位置固定；底层委托给外部协作服务。

use std::sync::Arc;

use async_trait::async_trait;

use crate::services::{LocalModel, Scheduler, Services, WebSearch};
use crate::skills::Skill;

pub const WEB_RESEARCH: &str = "web_research";
pub const SUMMARIZE: &str = "summarize";
pub const SCHEDULE_REMINDER: &str = "schedule_reminder";

/// 全部内置技能 id，按注册顺序
pub const BUILTIN_SKILLS: [&str; 3] = [WEB_RESEARCH, SUMMARIZE, SCHEDULE_REMINDER];

const NO_DATA: &str = "❌ No data found.";

/// 搜索后用本地模型总结摘要
pub struct WebResearchSkill {
    web: Arc<dyn WebSearch>,
    model: Arc<dyn LocalModel>,
}

impl WebResearchSkill {
    pub fn new(web: Arc<dyn WebSearch>, model: Arc<dyn LocalModel>) -> Self {
        Self { web, model }
    }
}

#[async_trait]
impl Skill for WebResearchSkill {
    fn description(&self) -> &str {
        "Search the web and summarize the findings"
    }

    async fn execute(&self, task: &str, _user_id: &str) -> Result<String, String> {
        let hits = self.web.search(task).await.map_err(|e| e.to_string())?;
        let snippets = hits
            .iter()
            .map(|h| h.snippet.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if snippets.is_empty() {
            return Ok(NO_DATA.to_string());
        }
        let summary = self
            .model
            .summarize(&snippets)
            .await
            .map_err(|e| e.to_string())?;
        if summary.trim().is_empty() {
            Ok(NO_DATA.to_string())
        } else {
            Ok(summary)
        }
    }
}

pub struct SummarizeSkill {
    model: Arc<dyn LocalModel>,
}

impl SummarizeSkill {
    pub fn new(model: Arc<dyn LocalModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Skill for SummarizeSkill {
    fn description(&self) -> &str {
        "Summarize a piece of text"
    }

    async fn execute(&self, task: &str, _user_id: &str) -> Result<String, String> {
        self.model.summarize(task).await.map_err(|e| e.to_string())
    }
}

pub struct ScheduleReminderSkill {
    scheduler: Arc<dyn Scheduler>,
}

impl ScheduleReminderSkill {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl Skill for ScheduleReminderSkill {
    fn description(&self) -> &str {
        "Schedule a reminder"
    }

    async fn execute(&self, task: &str, user_id: &str) -> Result<String, String> {
        self.scheduler
            .schedule(task, user_id)
            .await
            .map_err(|e| e.to_string())
    }
}

/// 按配置启用的内置技能；未知名称被忽略并告警
pub fn builtin_skills(enabled: &[String], services: &Services) -> Vec<(String, Arc<dyn Skill>)> {
    for name in enabled {
        if !BUILTIN_SKILLS.contains(&name.as_str()) {
            tracing::warn!(skill = %name, "unknown builtin skill in config, ignored");
        }
    }

    BUILTIN_SKILLS
        .iter()
        .filter(|id| enabled.iter().any(|e| e == *id))
        .map(|&id| {
            let skill: Arc<dyn Skill> = match id {
                WEB_RESEARCH => Arc::new(WebResearchSkill::new(
                    Arc::clone(&services.web),
                    Arc::clone(&services.local_model),
                )),
                SUMMARIZE => Arc::new(SummarizeSkill::new(Arc::clone(&services.local_model))),
                _ => Arc::new(ScheduleReminderSkill::new(Arc::clone(&services.scheduler))),
            };
            (id.to_string(), skill)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CollaboratorError;
    use crate::services::{ExtractiveModel, SearchHit};

    struct StaticSearch(Vec<SearchHit>);

    #[async_trait]
    impl WebSearch for StaticSearch {
        async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, CollaboratorError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_web_research_no_data() {
        let skill = WebResearchSkill::new(
            Arc::new(StaticSearch(vec![])),
            Arc::new(ExtractiveModel::default()),
        );
        assert_eq!(skill.execute("rust", "u").await, Ok(NO_DATA.to_string()));
    }

    #[tokio::test]
    async fn test_web_research_summarizes_snippets() {
        let hits = vec![SearchHit {
            title: "Rust".into(),
            snippet: "Rust is a systems programming language.".into(),
            url: "https://www.rust-lang.org".into(),
        }];
        let skill = WebResearchSkill::new(
            Arc::new(StaticSearch(hits)),
            Arc::new(ExtractiveModel::default()),
        );
        let out = skill.execute("rust", "u").await.unwrap();
        assert!(out.contains("systems programming"));
    }

    #[test]
    fn test_builtin_order_is_fixed() {
        let services = Services::offline();
        let enabled = vec![
            SCHEDULE_REMINDER.to_string(),
            WEB_RESEARCH.to_string(),
            "bogus".to_string(),
        ];
        let ids: Vec<String> = builtin_skills(&enabled, &services)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec![WEB_RESEARCH, SCHEDULE_REMINDER]);
    }
}
