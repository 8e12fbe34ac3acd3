//! 编排器构建器：统一的初始化逻辑
//!
//! CLI 与 HTTP 服务共用同一套注册表与协作服务，避免两个入口行为不一致。

use std::sync::Arc;

use anyhow::Context;

use crate::config::AppConfig;
use crate::core::{Orchestrator, OrchestratorOptions, TaskScheduler};
use crate::llm::{LlmClient, OpenAiClient, DEEPSEEK_BASE_URL};
use crate::services::{
    ActivityLog, DuckDuckGoSearch, InMemoryActivityLog, LlmLocalModel, LlmTaskExtractor,
    LlmTranslator, OfflineCodeGenerator, RegistrySuggester, Services, SqliteActivityLog,
};
use crate::skills::{builtin_skills, SkillInvoker, SkillLoader, SkillRegistry};

/// 根据配置与环境变量选择 LLM 后端（DeepSeek / OpenAI 兼容）；无 Key 或 provider = none 时返回 None
pub fn create_llm_from_config(cfg: &AppConfig) -> Option<Arc<dyn LlmClient>> {
    let provider = cfg.llm.provider.to_lowercase();
    if provider == "none" || provider == "offline" {
        tracing::info!("LLM disabled by config, running offline");
        return None;
    }
    let deepseek_key = std::env::var("DEEPSEEK_API_KEY").ok();
    let openai_key = std::env::var("OPENAI_API_KEY").ok();

    match (provider.as_str(), deepseek_key, openai_key) {
        ("deepseek", Some(key), _) | ("deepseek", None, Some(key)) => {
            let base = cfg.llm.base_url.as_deref().unwrap_or(DEEPSEEK_BASE_URL);
            tracing::info!("Using DeepSeek LLM ({})", cfg.llm.model);
            Some(Arc::new(OpenAiClient::new(Some(base), &cfg.llm.model, Some(&key))))
        }
        (_, _, Some(key)) => {
            tracing::info!("Using OpenAI-compatible LLM ({})", cfg.llm.model);
            Some(Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                Some(&key),
            )))
        }
        _ => {
            tracing::warn!("No API key set, running collaborators offline");
            None
        }
    }
}

/// 编排器构建器
pub struct OrchestratorBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
}

impl OrchestratorBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self { config, llm: None }
    }

    /// 显式指定 LLM（测试或自定义后端）；未指定时按配置与环境变量选择
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn build_activity_log(&self) -> Arc<dyn ActivityLog> {
        match &self.config.activity.sqlite_path {
            Some(path) => match SqliteActivityLog::open(path) {
                Ok(log) => {
                    tracing::info!(path = %path.display(), "activity log backed by SQLite");
                    Arc::new(log)
                }
                Err(e) => {
                    tracing::warn!("Failed to open activity db {}: {}, using memory", path.display(), e);
                    Arc::new(InMemoryActivityLog::default())
                }
            },
            None => Arc::new(InMemoryActivityLog::default()),
        }
    }

    /// 构建协作服务（suggester 在注册表建好后再替换）
    pub fn build_services(&self, llm: Option<Arc<dyn LlmClient>>) -> Services {
        let mut services = Services::offline()
            .with_activity(self.build_activity_log())
            .with_generator(Arc::new(OfflineCodeGenerator::new(
                self.config.app.artifact_dir.clone(),
            )))
            .with_web(Arc::new(DuckDuckGoSearch::new(15, 5)));

        if let Some(llm) = llm {
            services = services
                .with_language(Arc::new(LlmTranslator::new(Arc::clone(&llm))))
                .with_local_model(Arc::new(LlmLocalModel::new(Arc::clone(&llm))));
            if self.config.llm.use_for_extraction {
                services = services.with_extractor(Arc::new(LlmTaskExtractor::new(llm)));
            }
        }
        services
    }

    /// 构建注册表：内置技能在前（固定顺序），清单技能在后（目录名排序）
    pub fn build_registry(&self, services: &Services) -> SkillRegistry {
        let mut builder = SkillRegistry::builder();
        for (id, skill) in builtin_skills(&self.config.skills.builtin, services) {
            builder = builder.register_arc(id, skill);
        }

        let loader = SkillLoader::new(&self.config.skills.dir);
        match loader.load_all() {
            Ok(entries) => {
                for entry in entries {
                    builder = builder.add_entry(entry);
                }
            }
            Err(e) => tracing::warn!("Failed to load skills from {}: {}", loader.skills_dir().display(), e),
        }

        let registry = builder.build();
        tracing::info!(skills = registry.len(), ids = ?registry.ids(), "skill registry ready");
        registry
    }

    pub fn build(self) -> anyhow::Result<Orchestrator> {
        let llm = match &self.llm {
            Some(llm) => Some(Arc::clone(llm)),
            None => create_llm_from_config(&self.config),
        };
        let services = self.build_services(llm);
        let registry = Arc::new(self.build_registry(&services));
        let services =
            services.with_suggester(Arc::new(RegistrySuggester::new(registry.ids())));

        let skills = &self.config.skills;
        anyhow::ensure!(skills.timeout_secs > 0, "skills.timeout_secs must be positive");
        let invoker = SkillInvoker::new(
            Arc::new(TaskScheduler::new(skills.max_concurrent)),
            skills.timeout_secs,
        );

        Ok(Orchestrator::new(registry, services)
            .with_invoker(invoker)
            .with_options(OrchestratorOptions::from(&self.config.orchestrator)))
    }
}

/// 按配置构建编排器
pub fn build_orchestrator(config: &AppConfig) -> anyhow::Result<Orchestrator> {
    OrchestratorBuilder::new(config.clone())
        .build()
        .context("failed to build orchestrator")
}
