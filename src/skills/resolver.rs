//! 意图解析：意图字符串 -> 技能 id
//!
//! 规范化（小写、连续空白替换为单个下划线）后，按注册表迭代顺序扫描，
//! 第一个包含规范化意图的 id 胜出。不做打分排序。

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::skills::SkillRegistry;

static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

/// 小写并把每段连续空白替换为单个 `_`（首尾空白同样替换，不裁剪）
pub fn normalize_intent(intent: &str) -> String {
    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
    re.replace_all(&intent.to_lowercase(), "_").into_owned()
}

pub struct IntentResolver {
    registry: Arc<SkillRegistry>,
}

impl IntentResolver {
    pub fn new(registry: Arc<SkillRegistry>) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, intent: &str) -> Option<String> {
        // 全空白的意图不参与匹配，否则 "_" 会命中任意带下划线的 id
        if intent.trim().is_empty() {
            return None;
        }
        let norm = normalize_intent(intent);
        self.registry
            .iter()
            .find(|entry| entry.id.to_lowercase().contains(&norm))
            .map(|entry| entry.id.clone())
    }
}
