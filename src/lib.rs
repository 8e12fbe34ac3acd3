//! ULCS - 命令编排器
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 编排流水线、任务状态机、报告聚合、降级合成、请求监管
//! - **integrations**: HTTP 入口（web feature）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **observability**: 日志初始化
//! - **services**: 外部协作服务接口及离线 / LLM 实现
//! - **skills**: 技能注册表、意图解析、技能调用、清单加载

pub mod config;
pub mod core;
pub mod integrations;
pub mod llm;
pub mod observability;
pub mod services;
pub mod skills;

pub use crate::core::{build_orchestrator, Orchestrator, Outcome, Report};
