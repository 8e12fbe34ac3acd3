//! 技能执行并发池
//!
//! 进程级共享：所有请求的技能调用都先取得许可，Semaphore 限制同时执行的技能数。

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// 任务调度器
#[derive(Debug)]
pub struct TaskScheduler {
    /// 技能并发限制（默认 4）
    skill_slots: Arc<Semaphore>,
    capacity: usize,
}

impl TaskScheduler {
    pub fn new(max_concurrent_skills: usize) -> Self {
        let capacity = max_concurrent_skills.max(1);
        Self {
            skill_slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// 获取技能执行许可；Semaphore 被关闭时返回 None（调用方不受限继续执行）
    pub async fn acquire_slot(&self) -> Option<OwnedSemaphorePermit> {
        self.skill_slots.clone().acquire_owned().await.ok()
    }

    pub fn available(&self) -> usize {
        self.skill_slots.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permits_are_returned() {
        let scheduler = TaskScheduler::new(2);
        let a = scheduler.acquire_slot().await;
        let _b = scheduler.acquire_slot().await;
        assert_eq!(scheduler.available(), 0);
        drop(a);
        assert_eq!(scheduler.available(), 1);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        assert_eq!(TaskScheduler::new(0).capacity(), 1);
    }
}
