//! 外部协作服务
//!
//! 编排核心只依赖这些窄接口（async trait）。每个接口都附带离线默认实现，
//! 部分附带基于 LLM 的实现；Services 把它们打包成显式依赖，构造时注入 Orchestrator。

mod activity;
mod emotion;
mod extraction;
mod generation;
mod language;
mod memory;
mod notify;
mod scheduler;
mod suggest;
mod web;

use std::sync::Arc;

pub use activity::{
    ActivityLog, ActivityRecord, AnalyticsSummary, InMemoryActivityLog, SqliteActivityLog,
};
pub use emotion::{EmotionAnalyzer, KeywordEmotion};
pub use extraction::{LlmTaskExtractor, RuleTaskExtractor, TaskExtractor};
pub use generation::{
    ArtifactDescriptor, CodeGenerator, ExtractiveModel, LlmLocalModel, LocalModel,
    OfflineCodeGenerator,
};
pub use language::{HeuristicLanguage, LanguageService, LlmTranslator};
pub use memory::{KeywordMemory, MemoryRecall};
pub use notify::{Notification, Notifier, TracingNotifier};
pub use scheduler::{InMemoryScheduler, Reminder, Scheduler};
pub use suggest::{RegistrySuggester, SkillSuggester};
pub use web::{DuckDuckGoSearch, NoopWebSearch, SearchHit, WebSearch};

/// 编排器依赖的全部外部协作服务
#[derive(Clone)]
pub struct Services {
    pub language: Arc<dyn LanguageService>,
    pub extractor: Arc<dyn TaskExtractor>,
    pub emotion: Arc<dyn EmotionAnalyzer>,
    pub memory: Arc<dyn MemoryRecall>,
    pub suggester: Arc<dyn SkillSuggester>,
    pub activity: Arc<dyn ActivityLog>,
    pub notifier: Arc<dyn Notifier>,
    pub generator: Arc<dyn CodeGenerator>,
    pub local_model: Arc<dyn LocalModel>,
    pub web: Arc<dyn WebSearch>,
    pub scheduler: Arc<dyn Scheduler>,
}

impl Services {
    /// 全离线实现：不访问网络、不写磁盘
    pub fn offline() -> Self {
        Self {
            language: Arc::new(HeuristicLanguage),
            extractor: Arc::new(RuleTaskExtractor::new()),
            emotion: Arc::new(KeywordEmotion),
            memory: Arc::new(KeywordMemory::default()),
            suggester: Arc::new(RegistrySuggester::new(Vec::new())),
            activity: Arc::new(InMemoryActivityLog::default()),
            notifier: Arc::new(TracingNotifier),
            generator: Arc::new(OfflineCodeGenerator::new(None)),
            local_model: Arc::new(ExtractiveModel::default()),
            web: Arc::new(NoopWebSearch),
            scheduler: Arc::new(InMemoryScheduler::default()),
        }
    }

    pub fn with_language(mut self, language: Arc<dyn LanguageService>) -> Self {
        self.language = language;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TaskExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_emotion(mut self, emotion: Arc<dyn EmotionAnalyzer>) -> Self {
        self.emotion = emotion;
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryRecall>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_suggester(mut self, suggester: Arc<dyn SkillSuggester>) -> Self {
        self.suggester = suggester;
        self
    }

    pub fn with_activity(mut self, activity: Arc<dyn ActivityLog>) -> Self {
        self.activity = activity;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_local_model(mut self, local_model: Arc<dyn LocalModel>) -> Self {
        self.local_model = local_model;
        self
    }

    pub fn with_web(mut self, web: Arc<dyn WebSearch>) -> Self {
        self.web = web;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::offline()
    }
}
