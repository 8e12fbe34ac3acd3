//! 情绪分析：关键词计分，无命中时为 neutral

use async_trait::async_trait;

use crate::core::CollaboratorError;

#[async_trait]
pub trait EmotionAnalyzer: Send + Sync {
    async fn analyze_emotion(&self, text: &str) -> Result<String, CollaboratorError>;
}

const LEXICON: &[(&str, &[&str])] = &[
    ("happy", &["happy", "great", "awesome", "thanks", "love", "glad", "excited", "开心", "谢谢"]),
    ("sad", &["sad", "unhappy", "depressed", "lonely", "miss", "难过", "伤心"]),
    ("angry", &["angry", "furious", "annoyed", "hate", "terrible", "生气", "讨厌"]),
    ("anxious", &["worried", "anxious", "nervous", "stressed", "urgent", "asap", "担心", "着急"]),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordEmotion;

#[async_trait]
impl EmotionAnalyzer for KeywordEmotion {
    async fn analyze_emotion(&self, text: &str) -> Result<String, CollaboratorError> {
        let lower = text.to_lowercase();
        let best = LEXICON
            .iter()
            .map(|(label, words)| (*label, words.iter().filter(|w| lower.contains(*w)).count()))
            .filter(|(_, hits)| *hits > 0)
            .max_by_key(|(_, hits)| *hits);
        Ok(best.map(|(label, _)| label).unwrap_or("neutral").to_string())
    }
}
