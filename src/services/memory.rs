//! 记忆召回
//!
//! KeywordMemory：按用户保存历史输入，召回时取与当前文本词重叠最多的一条（无真实向量）。

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::core::CollaboratorError;

#[async_trait]
pub trait MemoryRecall: Send + Sync {
    /// 返回与 text 相关的记忆提示；无相关记忆时返回空串
    async fn recall_context(&self, user_id: &str, text: &str) -> Result<String, CollaboratorError>;

    async fn remember(&self, user_id: &str, text: &str) -> Result<(), CollaboratorError>;
}

/// 将文本切分为小写词集合，用于简单相似度（词重叠数）
fn tokenize_lower(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.chars().count() > 2)
        .collect()
}

pub struct KeywordMemory {
    store: RwLock<HashMap<String, Vec<(String, HashSet<String>)>>>,
    max_entries_per_user: usize,
}

impl KeywordMemory {
    pub fn new(max_entries_per_user: usize) -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            max_entries_per_user: max_entries_per_user.max(1),
        }
    }
}

impl Default for KeywordMemory {
    fn default() -> Self {
        Self::new(200)
    }
}

#[async_trait]
impl MemoryRecall for KeywordMemory {
    async fn recall_context(&self, user_id: &str, text: &str) -> Result<String, CollaboratorError> {
        let query = tokenize_lower(text);
        if query.is_empty() {
            return Ok(String::new());
        }
        let store = self
            .store
            .read()
            .map_err(|_| CollaboratorError::new("recall_context", "memory lock poisoned"))?;
        let best = store.get(user_id).and_then(|entries| {
            entries
                .iter()
                .rev()
                .map(|(text, tokens)| (text, query.intersection(tokens).count()))
                .filter(|(_, score)| *score > 0)
                .max_by_key(|(_, score)| *score)
        });
        Ok(best
            .map(|(text, _)| format!("Earlier you said: \"{}\"", text))
            .unwrap_or_default())
    }

    async fn remember(&self, user_id: &str, text: &str) -> Result<(), CollaboratorError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let mut store = self
            .store
            .write()
            .map_err(|_| CollaboratorError::new("remember", "memory lock poisoned"))?;
        let entries = store.entry(user_id.to_string()).or_default();
        entries.push((text.to_string(), tokenize_lower(text)));
        let n = entries.len();
        if n > self.max_entries_per_user {
            entries.drain(0..n - self.max_entries_per_user);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recall_best_overlap_per_user() {
        let mem = KeywordMemory::default();
        mem.remember("alice", "book a table at the italian restaurant").await.unwrap();
        mem.remember("alice", "call Bob about the quarterly report").await.unwrap();
        mem.remember("bob", "quarterly report draft").await.unwrap();

        let hint = mem.recall_context("alice", "send Bob the report").await.unwrap();
        assert!(hint.contains("quarterly report"));

        let none = mem.recall_context("carol", "send Bob the report").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_capacity() {
        let mem = KeywordMemory::new(1);
        mem.remember("u", "first entry words").await.unwrap();
        mem.remember("u", "second entry words").await.unwrap();
        let hint = mem.recall_context("u", "first").await.unwrap();
        assert!(hint.is_empty());
    }
}
