//! 技能调用器
//!
//! 在超时与并发许可内执行已解析的技能；Err、panic、超时统一转为 SkillFailure，
//! 绝不向上传播。每次调用输出结构化审计日志（JSON）。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::time::timeout;

use crate::core::{SkillFailure, TaskScheduler};
use crate::skills::{SkillEntry, SkillHandle};

pub struct SkillInvoker {
    scheduler: Arc<TaskScheduler>,
    timeout: Duration,
}

impl SkillInvoker {
    pub fn new(scheduler: Arc<TaskScheduler>, timeout_secs: u64) -> Self {
        Self {
            scheduler,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn invoke(
        &self,
        entry: &SkillEntry,
        task: &str,
        user_id: &str,
    ) -> Result<String, SkillFailure> {
        let skill = match &entry.handle {
            SkillHandle::Executable(skill) => Arc::clone(skill),
            SkillHandle::Declared { source } => {
                tracing::warn!(
                    skill = %entry.id,
                    source = %source.display(),
                    "resolved skill has no execute() capability"
                );
                return Err(SkillFailure::MissingCapability);
            }
        };

        if self.scheduler.available() == 0 {
            tracing::debug!(
                skill = %entry.id,
                capacity = self.scheduler.capacity(),
                "skill slots exhausted, waiting"
            );
        }
        let _permit = self.scheduler.acquire_slot().await;
        let start = Instant::now();
        let call = AssertUnwindSafe(skill.execute(task, user_id)).catch_unwind();
        let result = match timeout(self.timeout, call).await {
            Ok(Ok(Ok(text))) => Ok(text),
            Ok(Ok(Err(e))) => Err(SkillFailure::Execution(e)),
            Ok(Err(payload)) => Err(SkillFailure::Panicked(panic_message(payload.as_ref()))),
            Err(_) => Err(SkillFailure::Timeout(self.timeout.as_millis() as u64)),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(SkillFailure::Timeout(_)) => "timeout",
            Err(SkillFailure::Panicked(_)) => "panic",
            Err(_) => "error",
        };
        let audit = serde_json::json!({
            "event": "skill_audit",
            "skill": entry.id,
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "task_preview": preview(task),
        });
        tracing::info!(audit = %audit.to_string(), "skill");

        result
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn preview(task: &str) -> String {
    if task.chars().count() > 120 {
        format!("{}...", task.chars().take(120).collect::<String>())
    } else {
        task.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::{Skill, SkillRegistry};
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Skill for Echo {
        async fn execute(&self, task: &str, user_id: &str) -> Result<String, String> {
            Ok(format!("{user_id}:{task}"))
        }
    }

    struct Failing;

    #[async_trait]
    impl Skill for Failing {
        async fn execute(&self, _task: &str, _user_id: &str) -> Result<String, String> {
            Err("disk full".to_string())
        }
    }

    struct Panicking;

    #[async_trait]
    impl Skill for Panicking {
        async fn execute(&self, _task: &str, _user_id: &str) -> Result<String, String> {
            panic!("skill exploded");
        }
    }

    struct Slow;

    #[async_trait]
    impl Skill for Slow {
        async fn execute(&self, _task: &str, _user_id: &str) -> Result<String, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }
    }

    fn invoker() -> SkillInvoker {
        SkillInvoker::new(Arc::new(TaskScheduler::default()), 30)
    }

    fn registry() -> SkillRegistry {
        SkillRegistry::builder()
            .register("echo", Echo)
            .register("failing", Failing)
            .register("panicking", Panicking)
            .register("slow", Slow)
            .declare("declared", "config/skills/declared/skill.toml")
            .build()
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let reg = registry();
        let out = invoker().invoke(reg.lookup("echo").unwrap(), "hi", "u1").await;
        assert_eq!(out, Ok("u1:hi".to_string()));
    }

    #[tokio::test]
    async fn test_declared_entry_is_missing_capability() {
        let reg = registry();
        let out = invoker().invoke(reg.lookup("declared").unwrap(), "hi", "u1").await;
        assert_eq!(out, Err(SkillFailure::MissingCapability));
    }

    #[tokio::test]
    async fn test_error_and_panic_are_captured() {
        let reg = registry();
        let inv = invoker();
        let err = inv.invoke(reg.lookup("failing").unwrap(), "x", "u").await;
        assert_eq!(err, Err(SkillFailure::Execution("disk full".into())));

        let panicked = inv.invoke(reg.lookup("panicking").unwrap(), "x", "u").await;
        assert_eq!(panicked, Err(SkillFailure::Panicked("skill exploded".into())));
    }

    #[tokio::test]
    async fn test_waits_for_free_slot() {
        let scheduler = Arc::new(TaskScheduler::new(1));
        let held = scheduler.acquire_slot().await;
        let inv = SkillInvoker::new(Arc::clone(&scheduler), 30);
        let reg = registry();
        let entry = reg.lookup("echo").unwrap();

        let pending = tokio::time::timeout(Duration::from_millis(20), inv.invoke(entry, "a", "u")).await;
        assert!(pending.is_err());

        drop(held);
        assert_eq!(inv.invoke(entry, "b", "u").await, Ok("u:b".to_string()));
        assert_eq!(scheduler.available(), 1);
    }

    #[tokio::test]
    async fn test_timeout() {
        let reg = registry();
        let inv = invoker().with_timeout(Duration::from_millis(20));
        let out = inv.invoke(reg.lookup("slow").unwrap(), "x", "u").await;
        assert_eq!(out, Err(SkillFailure::Timeout(20)));
    }
}
