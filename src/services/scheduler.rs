//! 提醒调度
//!
//! InMemoryScheduler 解析常见的相对时间（today / tomorrow / in N minutes|hours|days），
//! 无法识别时默认一小时后。提醒只保存在内存中，每个用户保留最近的若干条，已过期的在写入时清理。

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};
use regex::Regex;

use crate::core::CollaboratorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub user_id: String,
    pub what: String,
    pub due: DateTime<Utc>,
}

#[async_trait]
pub trait Scheduler: Send + Sync {
    /// 创建提醒，返回给用户的确认文本
    async fn schedule(&self, task: &str, user_id: &str) -> Result<String, CollaboratorError>;
}

pub struct InMemoryScheduler {
    reminders: Mutex<HashMap<String, Vec<Reminder>>>,
    max_reminders_per_user: usize,
    relative: Regex,
    filler: Regex,
}

impl Default for InMemoryScheduler {
    fn default() -> Self {
        Self::new(100)
    }
}

impl InMemoryScheduler {
    pub fn new(max_reminders_per_user: usize) -> Self {
        Self {
            reminders: Mutex::new(HashMap::new()),
            max_reminders_per_user: max_reminders_per_user.max(1),
            relative: Regex::new(r"(?i)\bin\s+(\d+)\s*(minute|min|hour|hr|day)s?\b")
                .expect("valid relative time regex"),
            filler: Regex::new(
                r"(?i)^\s*(?:please\s+)?(?:remind\s+me\s+(?:to\s+)?|set\s+(?:a\s+)?reminder\s+(?:to\s+|for\s+)?|schedule\s+)",
            )
            .expect("valid filler regex"),
        }
    }

    /// 用户的全部提醒，按到期时间排序
    pub fn reminders(&self, user_id: &str) -> Vec<Reminder> {
        let Ok(all) = self.reminders.lock() else {
            return Vec::new();
        };
        let mut mine = all.get(user_id).cloned().unwrap_or_default();
        mine.sort_by_key(|r| r.due);
        mine
    }

    fn at_local(date: chrono::NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
        Local
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|t| t.with_timezone(&Utc))
    }

    /// 解析到期时间，返回 (到期时间, 去掉时间短语后的文本)
    fn parse_due(&self, text: &str, now: DateTime<Local>) -> (DateTime<Utc>, String) {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default();
        let lower = text.to_lowercase();

        if let Some(caps) = self.relative.captures(text) {
            let n: i64 = caps[1].parse().unwrap_or(1);
            let delta = match caps[2].to_lowercase().as_str() {
                "minute" | "min" => Duration::minutes(n),
                "day" => Duration::days(n),
                _ => Duration::hours(n),
            };
            let rest = self.relative.replace(text, "").to_string();
            return ((now + delta).with_timezone(&Utc), rest);
        }
        if lower.contains("tomorrow") {
            let date = now.date_naive() + Duration::days(1);
            let due = Self::at_local(date, nine)
                .unwrap_or_else(|| (now + Duration::days(1)).with_timezone(&Utc));
            return (due, strip_word(text, "tomorrow"));
        }
        if lower.contains("today") || lower.contains("tonight") {
            let evening = NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default();
            let due = Self::at_local(now.date_naive(), evening)
                .filter(|d| *d > now.with_timezone(&Utc))
                .unwrap_or_else(|| (now + Duration::hours(1)).with_timezone(&Utc));
            let rest = strip_word(&strip_word(text, "today"), "tonight");
            return (due, rest);
        }
        ((now + Duration::hours(1)).with_timezone(&Utc), text.to_string())
    }
}

fn strip_word(text: &str, word: &str) -> String {
    text.split_whitespace()
        .filter(|w| !w.trim_matches(|c: char| !c.is_alphanumeric()).eq_ignore_ascii_case(word))
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl Scheduler for InMemoryScheduler {
    async fn schedule(&self, task: &str, user_id: &str) -> Result<String, CollaboratorError> {
        let task = task.trim();
        if task.is_empty() {
            return Err(CollaboratorError::new("schedule_reminder", "nothing to remind"));
        }
        let (due, rest) = self.parse_due(task, Local::now());
        let what = self.filler.replace(&rest, "").trim().trim_end_matches('.').to_string();
        let what = if what.is_empty() { task.to_string() } else { what };

        let reminder = Reminder {
            user_id: user_id.to_string(),
            what: what.clone(),
            due,
        };
        {
            let mut all = self
                .reminders
                .lock()
                .map_err(|_| CollaboratorError::new("schedule_reminder", "scheduler lock poisoned"))?;
            let mine = all.entry(user_id.to_string()).or_default();
            let now = Utc::now();
            mine.retain(|r| r.due > now);
            mine.push(reminder);
            if mine.len() > self.max_reminders_per_user {
                let excess = mine.len() - self.max_reminders_per_user;
                mine.drain(0..excess);
            }
        }
        tracing::info!(user = %user_id, due = %due.to_rfc3339(), "reminder scheduled");

        Ok(format!(
            "⏰ Reminder set for {}: {}",
            due.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            what
        ))
    }
}
