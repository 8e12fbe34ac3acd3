//! 技能建议：按输入与技能 id 的词重叠推荐（保持注册顺序）

use async_trait::async_trait;

use crate::core::CollaboratorError;

#[async_trait]
pub trait SkillSuggester: Send + Sync {
    async fn suggest_skills(&self, text: &str) -> Result<Vec<String>, CollaboratorError>;
}

pub struct RegistrySuggester {
    skill_ids: Vec<String>,
    max_suggestions: usize,
}

impl RegistrySuggester {
    pub fn new(skill_ids: Vec<String>) -> Self {
        Self {
            skill_ids,
            max_suggestions: 3,
        }
    }
}

#[async_trait]
impl SkillSuggester for RegistrySuggester {
    async fn suggest_skills(&self, text: &str) -> Result<Vec<String>, CollaboratorError> {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 3)
            .map(str::to_lowercase)
            .collect();
        Ok(self
            .skill_ids
            .iter()
            .filter(|id| {
                id.to_lowercase()
                    .split('_')
                    .filter(|part| part.chars().count() > 3)
                    .any(|part| words.iter().any(|w| w.starts_with(part) || part.starts_with(w.as_str())))
            })
            .take(self.max_suggestions)
            .cloned()
            .collect())
    }
}
