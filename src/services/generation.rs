//! 降级生成：占位工具生成与本地模型
//!
//! OfflineCodeGenerator 为未匹配的意图写出占位 skill.toml（无 program，即缺少执行能力，
//! 需人工补全后才可执行）；未配置输出目录时只返回描述。
//! LocalModel 提供 summarize / process：ExtractiveModel 为抽取式离线实现，LlmLocalModel 走 LLM。

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::CollaboratorError;
use crate::llm::{LlmClient, Message};
use crate::skills::{normalize_intent, SkillManifest, SkillMeta, MANIFEST_FILE};

/// 生成的占位工具描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDescriptor {
    /// 占位技能 id（规范化后的意图）
    pub name: String,
    pub intent: String,
    /// 写出的清单路径（未落盘时为 None）
    pub path: Option<PathBuf>,
}

#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate_code_offline(&self, intent: &str)
        -> Result<ArtifactDescriptor, CollaboratorError>;
}

pub struct OfflineCodeGenerator {
    output_dir: Option<PathBuf>,
}

impl OfflineCodeGenerator {
    pub fn new(output_dir: Option<PathBuf>) -> Self {
        Self { output_dir }
    }
}

#[async_trait]
impl CodeGenerator for OfflineCodeGenerator {
    async fn generate_code_offline(
        &self,
        intent: &str,
    ) -> Result<ArtifactDescriptor, CollaboratorError> {
        let name = normalize_intent(intent.trim());
        if name.is_empty() {
            return Err(CollaboratorError::new("generate_code", "empty intent"));
        }
        // 只保留 [a-z0-9_]，避免写出越界路径
        let name: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        let name = if name.is_empty() { "generated_tool".to_string() } else { name };

        let Some(root) = &self.output_dir else {
            return Ok(ArtifactDescriptor {
                name,
                intent: intent.to_string(),
                path: None,
            });
        };

        let manifest = SkillManifest {
            skill: SkillMeta {
                id: name.clone(),
                description: format!("Auto-generated placeholder for intent \"{}\"", intent),
                tags: vec!["generated".to_string()],
                program: None,
                args: Vec::new(),
            },
        };
        let body = toml::to_string_pretty(&manifest)
            .map_err(|e| CollaboratorError::new("generate_code", e.to_string()))?;

        let dir = root.join(&name);
        let path = dir.join(MANIFEST_FILE);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CollaboratorError::new("generate_code", e.to_string()))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| CollaboratorError::new("generate_code", e.to_string()))?;
        tracing::info!(tool = %name, path = %path.display(), "placeholder tool generated");

        Ok(ArtifactDescriptor {
            name,
            intent: intent.to_string(),
            path: Some(path),
        })
    }
}

#[async_trait]
pub trait LocalModel: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, CollaboratorError>;

    /// 对无匹配技能的任务给出直接回答
    async fn process(&self, text: &str) -> Result<String, CollaboratorError>;
}

/// 抽取式离线模型：取前几句作为摘要
pub struct ExtractiveModel {
    max_sentences: usize,
    max_chars: usize,
}

impl ExtractiveModel {
    pub fn new(max_sentences: usize, max_chars: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
            max_chars: max_chars.max(16),
        }
    }
}

impl Default for ExtractiveModel {
    fn default() -> Self {
        Self::new(3, 400)
    }
}

#[async_trait]
impl LocalModel for ExtractiveModel {
    async fn summarize(&self, text: &str) -> Result<String, CollaboratorError> {
        let mut summary = String::new();
        let mut taken = 0;
        for sentence in text.split_inclusive(['.', '!', '?', '\n', '。']) {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }
            if !summary.is_empty() {
                summary.push(' ');
            }
            summary.push_str(sentence);
            taken += 1;
            if taken >= self.max_sentences {
                break;
            }
        }
        if summary.chars().count() > self.max_chars {
            summary = summary.chars().take(self.max_chars).collect::<String>() + "...";
        }
        Ok(summary)
    }

    async fn process(&self, text: &str) -> Result<String, CollaboratorError> {
        Ok(format!(
            "🤖 No matching skill yet for \"{}\". Working offline, so here is my best guess: \
             try rephrasing or install a skill for it.",
            text.trim()
        ))
    }
}

/// LLM 驱动的本地模型（可指向 Ollama 等 OpenAI 兼容端点）
pub struct LlmLocalModel {
    llm: Arc<dyn LlmClient>,
}

impl LlmLocalModel {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    async fn ask(&self, op: &'static str, system: &str, text: &str) -> Result<String, CollaboratorError> {
        let messages = vec![Message::system(system), Message::user(text.to_string())];
        self.llm
            .complete(&messages)
            .await
            .map(|s| s.trim().to_string())
            .map_err(|e| CollaboratorError::new(op, e))
    }
}

#[async_trait]
impl LocalModel for LlmLocalModel {
    async fn summarize(&self, text: &str) -> Result<String, CollaboratorError> {
        self.ask(
            "summarize",
            "Summarize the following text in at most three sentences.",
            text,
        )
        .await
    }

    async fn process(&self, text: &str) -> Result<String, CollaboratorError> {
        self.ask(
            "local_model",
            "You are a concise assistant. Answer the user's request directly.",
            text,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::skills::read_manifest;

    #[tokio::test]
    async fn test_generator_without_dir() {
        let gen = OfflineCodeGenerator::new(None);
        let artifact = gen.generate_code_offline("Write Poem").await.unwrap();
        assert_eq!(artifact.name, "write_poem");
        assert!(artifact.path.is_none());
        assert!(gen.generate_code_offline("   ").await.is_err());
    }

    #[tokio::test]
    async fn test_generator_writes_declared_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let gen = OfflineCodeGenerator::new(Some(tmp.path().to_path_buf()));
        let artifact = gen.generate_code_offline("book ../flight").await.unwrap();
        assert_eq!(artifact.name, "book_flight");

        let path = artifact.path.unwrap();
        assert!(path.starts_with(tmp.path()));
        let manifest = read_manifest(&path).unwrap();
        assert_eq!(manifest.skill.id, "book_flight");
        assert!(manifest.skill.program.is_none());
    }

    #[tokio::test]
    async fn test_extractive_summary() {
        let model = ExtractiveModel::new(2, 400);
        let out = model
            .summarize("First point. Second point! Third point? Fourth.")
            .await
            .unwrap();
        assert_eq!(out, "First point. Second point!");
    }

    #[tokio::test]
    async fn test_llm_local_model_maps_errors() {
        let model = LlmLocalModel::new(Arc::new(MockLlmClient::failing()));
        let err = model.process("hello").await.unwrap_err();
        assert_eq!(err.service, "local_model");

        let model = LlmLocalModel::new(Arc::new(MockLlmClient::with_reply("  short  ")));
        assert_eq!(model.summarize("long text").await.unwrap(), "short");
    }
}
