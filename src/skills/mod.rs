//! 技能系统
//!
//! 技能（Skill）是按 id 注册的处理器。注册表在启动时构建（内置技能 + 清单技能），
//! 请求期只读；IntentResolver 负责意图到 id 的匹配，SkillInvoker 负责执行与故障隔离。
//!
//! 清单目录结构：
//! ```text
//! config/skills/
//! ├── translate/
//! │   └── skill.toml      # [skill] id / description / program / args
//! └── ...
//! ```

pub mod builtin;
mod invoker;
mod loader;
mod registry;
mod resolver;
mod script;

pub use builtin::{builtin_skills, BUILTIN_SKILLS};
pub(crate) use invoker::panic_message;
pub use invoker::SkillInvoker;
pub use loader::{read_manifest, SkillLoader, SkillManifest, SkillMeta, MANIFEST_FILE};
pub use registry::{Skill, SkillEntry, SkillHandle, SkillRegistry, SkillRegistryBuilder};
pub use resolver::{normalize_intent, IntentResolver};
pub use script::ScriptSkill;
