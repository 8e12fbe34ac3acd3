//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ULCS__*` 覆盖（双下划线表示嵌套，如 `ULCS__ORCHESTRATOR__CONCURRENT=true`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub skills: SkillsSection,
    pub orchestrator: OrchestratorSection,
    pub activity: ActivitySection,
    pub server: ServerSection,
}

/// [app] 段：默认用户、占位工具输出目录
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// 请求未带 userId 时使用
    #[serde(default = "default_user_id")]
    pub default_user_id: String,
    /// 降级生成的占位清单写入目录；未设置时只返回描述，不落盘
    pub artifact_dir: Option<PathBuf>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            default_user_id: default_user_id(),
            artifact_dir: None,
        }
    }
}

fn default_user_id() -> String {
    "default_user".to_string()
}

/// [llm] 段：后端选择；无 API Key 时全部协作服务走离线实现
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// deepseek / openai / none
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    /// 子任务拆分与意图抽取是否走 LLM（否则用规则）
    #[serde(default)]
    pub use_for_extraction: bool,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            use_for_extraction: false,
        }
    }
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

/// [skills] 段：清单目录、启用的内置技能、单次调用超时与全局并发
#[derive(Debug, Clone, Deserialize)]
pub struct SkillsSection {
    #[serde(default = "default_skills_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_builtin")]
    pub builtin: Vec<String>,
    /// 单次技能调用超时（秒）
    #[serde(default = "default_skill_timeout_secs")]
    pub timeout_secs: u64,
    /// 进程内同时执行的技能上限
    #[serde(default = "default_max_concurrent_skills")]
    pub max_concurrent: usize,
}

impl Default for SkillsSection {
    fn default() -> Self {
        Self {
            dir: default_skills_dir(),
            builtin: default_builtin(),
            timeout_secs: default_skill_timeout_secs(),
            max_concurrent: default_max_concurrent_skills(),
        }
    }
}

fn default_skills_dir() -> PathBuf {
    PathBuf::from("config/skills")
}

fn default_builtin() -> Vec<String> {
    crate::skills::BUILTIN_SKILLS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_skill_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_skills() -> usize {
    4
}

/// [orchestrator] 段：执行模式、请求超时、降级与提示阈值
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorSection {
    /// false 时子任务顺序执行
    #[serde(default)]
    pub concurrent: bool,
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,
    /// 整个请求的超时（秒），0 表示不限
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 降级直答时，超过该字符数走 summarize
    #[serde(default = "default_summarize_threshold")]
    pub summarize_threshold: usize,
    #[serde(default = "default_usage_tip_threshold")]
    pub usage_tip_threshold: usize,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            concurrent: false,
            max_concurrent_tasks: default_max_concurrent_tasks(),
            request_timeout_secs: default_request_timeout_secs(),
            summarize_threshold: default_summarize_threshold(),
            usage_tip_threshold: default_usage_tip_threshold(),
        }
    }
}

fn default_max_concurrent_tasks() -> usize {
    4
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_summarize_threshold() -> usize {
    800
}

fn default_usage_tip_threshold() -> usize {
    3
}

/// [activity] 段：设置 sqlite_path 时活动日志落盘，否则只在内存
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ActivitySection {
    pub sqlite_path: Option<PathBuf>,
}

/// [server] 段
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

/// 从 config 目录加载配置，环境变量 ULCS__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 ULCS__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ULCS")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 加载失败时告警并使用默认配置
pub fn load_config_or_default(config_path: Option<PathBuf>) -> AppConfig {
    load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    })
}
