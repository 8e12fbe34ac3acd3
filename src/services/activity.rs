//! 活动日志与使用分析
//!
//! 每次请求记录一条 ActivityRecord（fire-and-forget 写入）；summarize 生成用户维度的统计，
//! intent_usage 供「高频意图自动化提示」使用。内存实现与 SQLite 实现二选一。

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::core::CollaboratorError;

#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub user_id: String,
    pub raw_input: String,
    pub tasks: Vec<String>,
    pub intents: Vec<String>,
    pub emotion: String,
    pub timestamp: DateTime<Utc>,
}

/// 用户维度统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub user_id: String,
    pub requests: usize,
    pub tasks: usize,
    /// (intent, 次数)，按次数降序、同次数按名称
    pub top_intents: Vec<(String, usize)>,
    pub last_active: Option<String>,
}

impl fmt::Display for AnalyticsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📊 Analytics for {}", self.user_id)?;
        writeln!(f, "Requests: {}", self.requests)?;
        writeln!(f, "Tasks: {}", self.tasks)?;
        if let Some(last) = &self.last_active {
            writeln!(f, "Last active: {}", last)?;
        }
        if !self.top_intents.is_empty() {
            writeln!(f, "Top intents:")?;
            for (intent, n) in &self.top_intents {
                writeln!(f, "  {} × {}", intent, n)?;
            }
        }
        Ok(())
    }
}

const TOP_INTENTS: usize = 5;

fn rank_intents(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_INTENTS);
    ranked
}

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn log_activity(&self, record: ActivityRecord) -> Result<(), CollaboratorError>;

    async fn summarize(&self, user_id: &str) -> Result<AnalyticsSummary, CollaboratorError>;

    /// 用户历史上某个意图出现的次数
    async fn intent_usage(&self, user_id: &str, intent: &str) -> Result<usize, CollaboratorError>;
}

/// 内存实现：每个用户只保留最近 max_records_per_user 条，统计基于这个窗口
pub struct InMemoryActivityLog {
    records: Mutex<HashMap<String, VecDeque<ActivityRecord>>>,
    max_records_per_user: usize,
}

impl InMemoryActivityLog {
    pub fn new(max_records_per_user: usize) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            max_records_per_user: max_records_per_user.max(1),
        }
    }

    fn with_records<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut HashMap<String, VecDeque<ActivityRecord>>) -> T,
    ) -> Result<T, CollaboratorError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| CollaboratorError::new(op, "activity lock poisoned"))?;
        Ok(f(&mut *records))
    }
}

impl Default for InMemoryActivityLog {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl ActivityLog for InMemoryActivityLog {
    async fn log_activity(&self, record: ActivityRecord) -> Result<(), CollaboratorError> {
        let cap = self.max_records_per_user;
        self.with_records("log_activity", |records| {
            let mine = records.entry(record.user_id.clone()).or_default();
            mine.push_back(record);
            while mine.len() > cap {
                mine.pop_front();
            }
        })
    }

    async fn summarize(&self, user_id: &str) -> Result<AnalyticsSummary, CollaboratorError> {
        self.with_records("summarize_analytics", |records| {
            let mine = records.get(user_id);
            let mine: Vec<&ActivityRecord> = mine.map(|m| m.iter().collect()).unwrap_or_default();
            let mut counts: HashMap<String, usize> = HashMap::new();
            for intent in mine.iter().flat_map(|r| r.intents.iter()) {
                *counts.entry(intent.clone()).or_default() += 1;
            }
            AnalyticsSummary {
                user_id: user_id.to_string(),
                requests: mine.len(),
                tasks: mine.iter().map(|r| r.tasks.len()).sum(),
                top_intents: rank_intents(counts),
                last_active: mine.iter().map(|r| r.timestamp).max().map(|t| t.to_rfc3339()),
            }
        })
    }

    async fn intent_usage(&self, user_id: &str, intent: &str) -> Result<usize, CollaboratorError> {
        self.with_records("intent_usage", |records| {
            records
                .get(user_id)
                .map(|mine| {
                    mine.iter()
                        .flat_map(|r| r.intents.iter())
                        .filter(|i| i.as_str() == intent)
                        .count()
                })
                .unwrap_or(0)
        })
    }
}

/// SQLite 实现：同步连接由 Mutex 保护，查询放到 spawn_blocking 中
pub struct SqliteActivityLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteActivityLog {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS activity (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                raw_input TEXT NOT NULL,
                tasks TEXT NOT NULL,
                emotion TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS activity_intent (
                activity_id INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                intent TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_activity_user ON activity(user_id);
            CREATE INDEX IF NOT EXISTS idx_intent_user ON activity_intent(user_id, intent);
            "#,
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T, CollaboratorError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| CollaboratorError::new(op, "sqlite lock poisoned"))?;
            f(&mut *guard).map_err(|e| CollaboratorError::new(op, e.to_string()))
        })
        .await
        .map_err(|e| CollaboratorError::new(op, e.to_string()))?
    }
}

#[async_trait]
impl ActivityLog for SqliteActivityLog {
    async fn log_activity(&self, record: ActivityRecord) -> Result<(), CollaboratorError> {
        let tasks = serde_json::to_string(&record.tasks)
            .map_err(|e| CollaboratorError::new("log_activity", e.to_string()))?;
        self.run("log_activity", move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO activity (user_id, raw_input, tasks, emotion, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.user_id,
                    record.raw_input,
                    tasks,
                    record.emotion,
                    record.timestamp.to_rfc3339(),
                ],
            )?;
            let activity_id = tx.last_insert_rowid();
            for intent in &record.intents {
                tx.execute(
                    "INSERT INTO activity_intent (activity_id, user_id, intent) VALUES (?1, ?2, ?3)",
                    params![activity_id, record.user_id, intent],
                )?;
            }
            tx.commit()
        })
        .await
    }

    async fn summarize(&self, user_id: &str) -> Result<AnalyticsSummary, CollaboratorError> {
        let user_id = user_id.to_string();
        self.run("summarize_analytics", move |conn| {
            let (requests, last_active): (i64, Option<String>) = conn.query_row(
                "SELECT COUNT(*), MAX(timestamp) FROM activity WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let mut tasks = 0usize;
            let mut stmt = conn.prepare("SELECT tasks FROM activity WHERE user_id = ?1")?;
            let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;
            for row in rows {
                tasks += serde_json::from_str::<Vec<String>>(&row?)
                    .map(|t| t.len())
                    .unwrap_or(0);
            }

            let mut stmt = conn.prepare(
                "SELECT intent, COUNT(*) FROM activity_intent WHERE user_id = ?1 GROUP BY intent",
            )?;
            let counts = stmt
                .query_map(params![user_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
                })?
                .collect::<rusqlite::Result<HashMap<String, usize>>>()?;

            Ok(AnalyticsSummary {
                user_id,
                requests: requests as usize,
                tasks,
                top_intents: rank_intents(counts),
                last_active,
            })
        })
        .await
    }

    async fn intent_usage(&self, user_id: &str, intent: &str) -> Result<usize, CollaboratorError> {
        let user_id = user_id.to_string();
        let intent = intent.to_string();
        self.run("intent_usage", move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM activity_intent WHERE user_id = ?1 AND intent = ?2",
                params![user_id, intent],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as usize)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, intents: &[&str]) -> ActivityRecord {
        ActivityRecord {
            user_id: user.to_string(),
            raw_input: "input".to_string(),
            tasks: intents.iter().map(|i| format!("task for {i}")).collect(),
            intents: intents.iter().map(|s| s.to_string()).collect(),
            emotion: "neutral".to_string(),
            timestamp: Utc::now(),
        }
    }

    async fn exercise(log: &dyn ActivityLog) {
        log.log_activity(record("alice", &["schedule", "summarize"])).await.unwrap();
        log.log_activity(record("alice", &["schedule"])).await.unwrap();
        log.log_activity(record("bob", &["schedule"])).await.unwrap();

        assert_eq!(log.intent_usage("alice", "schedule").await.unwrap(), 2);
        assert_eq!(log.intent_usage("alice", "translate").await.unwrap(), 0);

        let summary = log.summarize("alice").await.unwrap();
        assert_eq!(summary.requests, 2);
        assert_eq!(summary.tasks, 3);
        assert_eq!(
            summary.top_intents,
            vec![("schedule".to_string(), 2), ("summarize".to_string(), 1)]
        );
        assert!(summary.last_active.is_some());
        assert!(summary.to_string().contains("Requests: 2"));
    }

    #[tokio::test]
    async fn test_in_memory_log() {
        exercise(&InMemoryActivityLog::default()).await;
    }

    #[tokio::test]
    async fn test_in_memory_log_caps_per_user() {
        let log = InMemoryActivityLog::new(2);
        log.log_activity(record("alice", &["weather"])).await.unwrap();
        log.log_activity(record("alice", &["schedule"])).await.unwrap();
        log.log_activity(record("alice", &["schedule"])).await.unwrap();
        log.log_activity(record("bob", &["weather"])).await.unwrap();

        assert_eq!(log.summarize("alice").await.unwrap().requests, 2);
        assert_eq!(log.intent_usage("alice", "weather").await.unwrap(), 0);
        assert_eq!(log.intent_usage("alice", "schedule").await.unwrap(), 2);
        assert_eq!(log.intent_usage("bob", "weather").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_log() {
        exercise(&SqliteActivityLog::open_in_memory().unwrap()).await;
    }

    #[tokio::test]
    async fn test_sqlite_file_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data/activity.db");
        {
            let log = SqliteActivityLog::open(&path).unwrap();
            log.log_activity(record("u", &["weather"])).await.unwrap();
        }
        let log = SqliteActivityLog::open(&path).unwrap();
        assert_eq!(log.intent_usage("u", "weather").await.unwrap(), 1);
    }
}
