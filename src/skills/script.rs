//! 脚本技能：由 skill.toml 的 program + args 模板构成
//!
//! 参数模板中 {{task}}、{{user_id}}、{{dir}} 被替换；无 shell，直接 exec，
//! 工作目录为技能目录。子进程随 future 丢弃而终止（超时 / 取消时不留孤儿）。

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::skills::{Skill, SkillMeta};

pub struct ScriptSkill {
    id: String,
    description: String,
    program: String,
    args_template: Vec<String>,
    dir: PathBuf,
}

impl ScriptSkill {
    pub fn new(meta: SkillMeta, dir: &Path) -> Self {
        Self {
            id: meta.id,
            description: meta.description,
            program: meta.program.unwrap_or_default(),
            args_template: meta.args,
            dir: dir.to_path_buf(),
        }
    }

    fn substitute(&self, task: &str, user_id: &str) -> Vec<String> {
        let dir = self.dir.to_string_lossy();
        self.args_template
            .iter()
            .map(|tpl| {
                tpl.replace("{{task}}", task)
                    .replace("{{user_id}}", user_id)
                    .replace("{{dir}}", &dir)
            })
            .collect()
    }
}

#[async_trait]
impl Skill for ScriptSkill {
    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, task: &str, user_id: &str) -> Result<String, String> {
        let args = self.substitute(task, user_id);
        tracing::debug!(skill = %self.id, program = %self.program, "script skill invoke");
        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("spawn {} failed: {}", self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "exit {:?}: {}",
                output.status.code(),
                stderr.trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(program: &str, args: &[&str]) -> SkillMeta {
        SkillMeta {
            id: "script".into(),
            description: String::new(),
            tags: vec![],
            program: Some(program.into()),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_substitute() {
        let skill = ScriptSkill::new(meta("echo", &["{{user_id}}", "--", "{{task}}"]), Path::new("/tmp"));
        assert_eq!(
            skill.substitute("call Bob", "alice"),
            vec!["alice", "--", "call Bob"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_echo() {
        let tmp = tempfile::tempdir().unwrap();
        let skill = ScriptSkill::new(meta("echo", &["hello", "{{task}}"]), tmp.path());
        assert_eq!(skill.execute("world", "u").await, Ok("hello world".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_missing_program() {
        let tmp = tempfile::tempdir().unwrap();
        let skill = ScriptSkill::new(meta("ulcs-no-such-program", &[]), tmp.path());
        let err = skill.execute("x", "u").await.unwrap_err();
        assert!(err.contains("spawn"));
    }
}
