//! 降级合成：意图未命中任何技能时，本地模型直答并生成占位工具
//!
//! 两步各自独立降级，始终产出 NoSkillFallback，不向上传播错误。

use std::sync::Arc;

use crate::core::Outcome;
use crate::services::{CodeGenerator, LocalModel};

pub struct FallbackSynthesizer {
    local_model: Arc<dyn LocalModel>,
    generator: Arc<dyn CodeGenerator>,
    /// 超过该字符数的任务走 summarize，否则 process
    summarize_threshold: usize,
}

impl FallbackSynthesizer {
    pub fn new(
        local_model: Arc<dyn LocalModel>,
        generator: Arc<dyn CodeGenerator>,
        summarize_threshold: usize,
    ) -> Self {
        Self {
            local_model,
            generator,
            summarize_threshold,
        }
    }

    pub async fn synthesize(&self, task: &str, intent: &str) -> Outcome {
        let answer = if task.chars().count() > self.summarize_threshold {
            self.local_model.summarize(task).await
        } else {
            self.local_model.process(task).await
        };
        let mut text = answer.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "local model failed during fallback");
            format!("Local model failed: {}", e.message)
        });

        let artifact = match self.generator.generate_code_offline(intent).await {
            Ok(a) => Some(a),
            Err(e) => {
                tracing::warn!(intent = %intent, error = %e, "placeholder generation failed");
                text.push_str(&format!("\n(generation failed: {})", e.message));
                None
            }
        };

        Outcome::NoSkillFallback {
            intent: intent.to_string(),
            text,
            artifact,
        }
    }
}
