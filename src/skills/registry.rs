//! 技能注册表
//!
//! 所有可执行技能实现 Skill trait，按 id 注册。注册顺序即迭代顺序（决定模糊匹配的胜者），
//! 启动时由 SkillRegistryBuilder 构建，冻结后以 Arc<SkillRegistry> 在请求间只读共享。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

/// 技能 trait：对单个任务执行，返回文本结果
#[async_trait]
pub trait Skill: Send + Sync {
    /// 技能描述（供建议与日志）
    fn description(&self) -> &str {
        ""
    }

    async fn execute(&self, task: &str, user_id: &str) -> Result<String, String>;
}

/// 注册项持有的句柄：可执行，或仅声明（清单中没有可运行程序）
#[derive(Clone)]
pub enum SkillHandle {
    Executable(Arc<dyn Skill>),
    /// 缺少执行能力；source 指向声明它的清单
    Declared { source: PathBuf },
}

impl std::fmt::Debug for SkillHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkillHandle::Executable(_) => f.write_str("Executable(..)"),
            SkillHandle::Declared { source } => {
                f.debug_struct("Declared").field("source", source).finish()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkillEntry {
    pub id: String,
    pub handle: SkillHandle,
}

impl SkillEntry {
    pub fn description(&self) -> &str {
        match &self.handle {
            SkillHandle::Executable(skill) => skill.description(),
            SkillHandle::Declared { .. } => "",
        }
    }
}

/// 只读注册表：Vec 保序 + HashMap 索引
#[derive(Debug, Default)]
pub struct SkillRegistry {
    entries: Vec<SkillEntry>,
    index: HashMap<String, usize>,
}

impl SkillRegistry {
    pub fn builder() -> SkillRegistryBuilder {
        SkillRegistryBuilder::default()
    }

    /// 未找到是正常的路由结果，不是错误
    pub fn lookup(&self, id: &str) -> Option<&SkillEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    /// 按注册顺序迭代
    pub fn iter(&self) -> impl Iterator<Item = &SkillEntry> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 注册表构建器；重复 id 替换句柄但保留原位置
#[derive(Default)]
pub struct SkillRegistryBuilder {
    registry: SkillRegistry,
}

impl SkillRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, id: impl Into<String>, skill: impl Skill + 'static) -> Self {
        self.insert(id.into(), SkillHandle::Executable(Arc::new(skill)));
        self
    }

    pub fn register_arc(mut self, id: impl Into<String>, skill: Arc<dyn Skill>) -> Self {
        self.insert(id.into(), SkillHandle::Executable(skill));
        self
    }

    pub fn declare(mut self, id: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        self.insert(
            id.into(),
            SkillHandle::Declared {
                source: source.into(),
            },
        );
        self
    }

    pub fn add_entry(mut self, entry: SkillEntry) -> Self {
        self.insert(entry.id, entry.handle);
        self
    }

    fn insert(&mut self, id: String, handle: SkillHandle) {
        let registry = &mut self.registry;
        match registry.index.get(&id) {
            Some(&i) => {
                tracing::warn!(skill = %id, "duplicate skill id, replacing handle");
                registry.entries[i].handle = handle;
            }
            None => {
                registry.index.insert(id.clone(), registry.entries.len());
                registry.entries.push(SkillEntry { id, handle });
            }
        }
    }

    pub fn build(self) -> SkillRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl Skill for Fixed {
        async fn execute(&self, _task: &str, _user_id: &str) -> Result<String, String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_iteration_follows_registration_order() {
        let registry = SkillRegistry::builder()
            .register("zeta", Fixed("z"))
            .register("alpha", Fixed("a"))
            .declare("mid", "config/skills/mid/skill.toml")
            .build();
        assert_eq!(registry.ids(), vec!["zeta", "alpha", "mid"]);
        assert!(registry.lookup("alpha").is_some());
        assert!(registry.lookup("missing").is_none());
        assert!(matches!(
            registry.lookup("mid").map(|e| &e.handle),
            Some(SkillHandle::Declared { .. })
        ));
    }

    #[test]
    fn test_duplicate_keeps_position() {
        let registry = SkillRegistry::builder()
            .declare("a", "a.toml")
            .register("b", Fixed("b"))
            .register("a", Fixed("a"))
            .build();
        assert_eq!(registry.ids(), vec!["a", "b"]);
        assert!(matches!(
            registry.lookup("a").map(|e| &e.handle),
            Some(SkillHandle::Executable(_))
        ));
    }
}
