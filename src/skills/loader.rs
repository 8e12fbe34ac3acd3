//! 技能清单加载器
//!
//! 启动时从 config/skills/ 目录加载 skill.toml，生成注册项：
//! 声明了 program 的为可执行 ScriptSkill，未声明的为 Declared（缺少执行能力）。
//! 子目录按名称排序加载，保证注册顺序确定。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::skills::{ScriptSkill, SkillEntry, SkillHandle};

/// 技能元数据（skill.toml 的 [skill] 段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMeta {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// 可执行程序；缺省表示该技能只有声明没有执行能力
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// 参数模板，支持 {{task}} / {{user_id}} / {{dir}}
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillManifest {
    pub skill: SkillMeta,
}

pub const MANIFEST_FILE: &str = "skill.toml";

/// 技能加载器
pub struct SkillLoader {
    skills_dir: PathBuf,
}

impl SkillLoader {
    pub fn new(skills_dir: impl AsRef<Path>) -> Self {
        Self {
            skills_dir: skills_dir.as_ref().to_path_buf(),
        }
    }

    pub fn skills_dir(&self) -> &Path {
        &self.skills_dir
    }

    /// 加载所有技能清单；目录不存在时返回空
    pub fn load_all(&self) -> anyhow::Result<Vec<SkillEntry>> {
        if !self.skills_dir.exists() {
            return Ok(Vec::new());
        }

        let mut dirs: Vec<PathBuf> = std::fs::read_dir(&self.skills_dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        let entries: Vec<SkillEntry> = dirs
            .iter()
            .filter_map(|dir| self.load_skill(dir))
            .collect();

        tracing::info!(
            "Loaded {} skill manifests from {}",
            entries.len(),
            self.skills_dir.display()
        );
        Ok(entries)
    }

    fn load_skill(&self, dir: &Path) -> Option<SkillEntry> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return None;
        }

        let manifest = match read_manifest(&manifest_path) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(path = %manifest_path.display(), "skipping skill manifest: {}", e);
                return None;
            }
        };

        let meta = manifest.skill;
        let id = meta.id.clone();
        let handle = if meta.program.is_some() {
            SkillHandle::Executable(Arc::new(ScriptSkill::new(meta, dir)))
        } else {
            SkillHandle::Declared {
                source: manifest_path,
            }
        };
        Some(SkillEntry { id, handle })
    }
}

pub fn read_manifest(path: &Path) -> anyhow::Result<SkillManifest> {
    let content = std::fs::read_to_string(path)?;
    let manifest: SkillManifest = toml::from_str(&content)?;
    if manifest.skill.id.trim().is_empty() {
        anyhow::bail!("skill id is empty");
    }
    Ok(manifest)
}
