//! Mock LLM 客户端（用于测试与无 API Key 的场景）
//!
//! 默认回显最后一条 User 消息；可设固定回复或固定失败。

use async_trait::async_trait;

use crate::llm::{LlmClient, Message, Role};

#[derive(Debug, Default, Clone)]
pub struct MockLlmClient {
    reply: Option<String>,
    fail: bool,
}

impl MockLlmClient {
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            fail: true,
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if self.fail {
            return Err("mock llm failure".to_string());
        }
        if let Some(reply) = &self.reply {
            return Ok(reply.clone());
        }
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(last_user.to_string())
    }
}
