//! 语言检测与翻译
//!
//! HeuristicLanguage 按字符所属文字体系判断语言，翻译为原样透传；
//! LlmTranslator 检测同上，目标语言不同时交给 LLM 翻译。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::CollaboratorError;
use crate::llm::{LlmClient, Message};

#[async_trait]
pub trait LanguageService: Send + Sync {
    async fn detect_language(&self, text: &str) -> Result<String, CollaboratorError>;

    async fn translate_text(&self, text: &str, target_lang: &str)
        -> Result<String, CollaboratorError>;
}

/// 按文字体系计数，取最多者；纯拉丁字母视为英文
pub fn detect_script_language(text: &str) -> &'static str {
    let mut counts = [0usize; 7];
    const CODES: [&str; 7] = ["zh", "ja", "ko", "ru", "ar", "hi", "en"];
    for c in text.chars() {
        let slot = match c as u32 {
            0x3040..=0x30FF => 1,
            0x4E00..=0x9FFF | 0x3400..=0x4DBF => 0,
            0xAC00..=0xD7AF | 0x1100..=0x11FF => 2,
            0x0400..=0x04FF => 3,
            0x0600..=0x06FF => 4,
            0x0900..=0x097F => 5,
            _ if c.is_ascii_alphabetic() => 6,
            _ => continue,
        };
        counts[slot] += 1;
    }
    // 日文常混用汉字，出现假名即判为日文
    if counts[1] > 0 {
        return "ja";
    }
    counts
        .iter()
        .enumerate()
        .filter(|&(_, &n)| n > 0)
        .max_by_key(|&(i, &n)| (n, usize::MAX - i))
        .map(|(i, _)| CODES[i])
        .unwrap_or("en")
}

/// 离线实现：检测靠字符范围，翻译原样返回
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicLanguage;

#[async_trait]
impl LanguageService for HeuristicLanguage {
    async fn detect_language(&self, text: &str) -> Result<String, CollaboratorError> {
        Ok(detect_script_language(text).to_string())
    }

    async fn translate_text(
        &self,
        text: &str,
        _target_lang: &str,
    ) -> Result<String, CollaboratorError> {
        Ok(text.trim().to_string())
    }
}

/// LLM 翻译：源语言与目标语言一致时不调用模型
pub struct LlmTranslator {
    llm: Arc<dyn LlmClient>,
}

impl LlmTranslator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl LanguageService for LlmTranslator {
    async fn detect_language(&self, text: &str) -> Result<String, CollaboratorError> {
        Ok(detect_script_language(text).to_string())
    }

    async fn translate_text(
        &self,
        text: &str,
        target_lang: &str,
    ) -> Result<String, CollaboratorError> {
        if detect_script_language(text) == target_lang {
            return Ok(text.trim().to_string());
        }
        let messages = vec![
            Message::system(format!(
                "Translate the user's text into the language with ISO code '{}'. \
                 Output only the translation, nothing else.",
                target_lang
            )),
            Message::user(text.to_string()),
        ];
        let out = self
            .llm
            .complete(&messages)
            .await
            .map_err(|e| CollaboratorError::new("translate", e))?;
        Ok(out.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_scripts() {
        assert_eq!(detect_script_language("Remind me to call Bob"), "en");
        assert_eq!(detect_script_language("提醒我明天给鲍勃打电话"), "zh");
        assert_eq!(detect_script_language("明日ボブに電話する"), "ja");
        assert_eq!(detect_script_language("내일 밥에게 전화"), "ko");
        assert_eq!(detect_script_language("Позвони Бобу"), "ru");
        assert_eq!(detect_script_language("1234 !!"), "en");
    }

    #[tokio::test]
    async fn test_heuristic_translate_passthrough() {
        let svc = HeuristicLanguage;
        assert_eq!(
            svc.translate_text("  hello  ", "en").await.unwrap(),
            "hello"
        );
    }

    #[tokio::test]
    async fn test_llm_translator_skips_same_language() {
        let svc = LlmTranslator::new(Arc::new(crate::llm::MockLlmClient::failing()));
        assert_eq!(svc.translate_text("hello", "en").await.unwrap(), "hello");
        assert!(svc.translate_text("你好", "en").await.is_err());
    }
}
