//! 命令编排器：主控流水线
//!
//! 负责：语言检测与翻译、情绪与记忆、子任务拆分、逐任务意图解析与技能执行（或降级生成），
//! 并把活动日志、通知、记忆写入放到后台（fire-and-forget），最后聚合为 Report。
//! 任何批次级故障由顶层守卫转为单行错误报告，调用方永远只拿到文本。

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::BoxFuture;
use futures_util::stream::{self, StreamExt};
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{OrchestratorSection, SkillsSection};
use crate::core::{
    CollaboratorError, FallbackSynthesizer, OrchestratorError, Outcome, Report, SessionSupervisor,
    Task, TaskPhase, TaskScheduler, Trailer,
};
use crate::services::{ActivityRecord, AnalyticsSummary, Notification, Services};
use crate::skills::{panic_message, IntentResolver, SkillInvoker, SkillRegistry};

/// 编排参数（对应 [orchestrator] 配置段）
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// false 时子任务按顺序逐个执行
    pub concurrent: bool,
    pub max_concurrent_tasks: usize,
    /// 整个请求的截止时间；None 表示不限
    pub request_timeout: Option<Duration>,
    pub summarize_threshold: usize,
    pub usage_tip_threshold: usize,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from(&OrchestratorSection::default())
    }
}

impl From<&OrchestratorSection> for OrchestratorOptions {
    fn from(cfg: &OrchestratorSection) -> Self {
        Self {
            concurrent: cfg.concurrent,
            max_concurrent_tasks: cfg.max_concurrent_tasks.max(1),
            request_timeout: (cfg.request_timeout_secs > 0)
                .then(|| Duration::from_secs(cfg.request_timeout_secs)),
            summarize_threshold: cfg.summarize_threshold,
            usage_tip_threshold: cfg.usage_tip_threshold,
        }
    }
}

/// 单个任务的执行结果（intent 为 None 表示任务未启动）
struct TaskRun {
    intent: Option<String>,
    outcome: Outcome,
}

pub struct Orchestrator {
    registry: Arc<SkillRegistry>,
    resolver: IntentResolver,
    invoker: SkillInvoker,
    fallback: FallbackSynthesizer,
    services: Services,
    options: OrchestratorOptions,
    /// 进程级关闭信号，每个请求的取消令牌都是它的子 token
    shutdown: CancellationToken,
}

impl Orchestrator {
    pub fn new(registry: Arc<SkillRegistry>, services: Services) -> Self {
        let options = OrchestratorOptions::default();
        Self {
            resolver: IntentResolver::new(Arc::clone(&registry)),
            invoker: SkillInvoker::new(
                Arc::new(TaskScheduler::default()),
                SkillsSection::default().timeout_secs,
            ),
            fallback: Self::fallback_for(&services, &options),
            registry,
            services,
            options,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.fallback = Self::fallback_for(&self.services, &options);
        self.options = options;
        self
    }

    pub fn with_invoker(mut self, invoker: SkillInvoker) -> Self {
        self.invoker = invoker;
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    fn fallback_for(services: &Services, options: &OrchestratorOptions) -> FallbackSynthesizer {
        FallbackSynthesizer::new(
            Arc::clone(&services.local_model),
            Arc::clone(&services.generator),
            options.summarize_threshold,
        )
    }

    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.registry
    }

    /// 处理一条原始命令，始终返回报告
    pub async fn handle_command(&self, raw_input: &str, user_id: &str) -> Report {
        self.handle_command_with_cancel(raw_input, user_id, &self.shutdown)
            .await
    }

    /// 同 handle_command，但由调用方提供取消来源（父 token 取消时本请求取消）
    pub async fn handle_command_with_cancel(
        &self,
        raw_input: &str,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Report {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("request", id = %request_id, user = %user_id);
        let supervisor = SessionSupervisor::with_parent(cancel, self.options.request_timeout);
        let token = supervisor.cancel_token();

        let guarded = AssertUnwindSafe(self.run_request(raw_input, user_id, &token))
            .catch_unwind()
            .instrument(span.clone())
            .await;
        let result = match guarded {
            Ok(r) => r,
            Err(payload) => Err(OrchestratorError::Internal(panic_message(payload.as_ref()))),
        };
        if supervisor.is_cancelled() {
            span.in_scope(|| tracing::warn!("request finished after cancellation"));
        }

        match result {
            Ok(report) => report,
            Err(e) => {
                span.in_scope(|| tracing::error!(error = %e, "request failed"));
                Report::fatal(&e)
            }
        }
    }

    /// 用户维度的使用统计
    pub async fn analytics_dashboard(
        &self,
        user_id: &str,
    ) -> Result<AnalyticsSummary, CollaboratorError> {
        self.services.activity.summarize(user_id).await
    }

    async fn run_request(
        &self,
        raw_input: &str,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Report, OrchestratorError> {
        let raw = raw_input.trim();
        if raw.is_empty() {
            return Err(OrchestratorError::EmptyInput);
        }
        tracing::info!(chars = raw.chars().count(), "command received");

        let language = until_cancelled(cancel, self.services.language.detect_language(raw))
            .await?
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "language detection failed");
                "unknown".to_string()
            });
        tracing::info!(language = %language, "language detected");

        let translated =
            until_cancelled(cancel, self.services.language.translate_text(raw, "en")).await??;
        let translated = match translated.trim() {
            "" => raw.to_string(),
            t => t.to_string(),
        };

        let (emotion, memory_hint) = tokio::join!(
            until_cancelled(cancel, self.services.emotion.analyze_emotion(raw)),
            until_cancelled(cancel, self.services.memory.recall_context(user_id, &translated)),
        );
        let emotion = match emotion {
            Ok(Ok(emotion)) => emotion,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "emotion analysis failed");
                "neutral".to_string()
            }
            Err(_) => "neutral".to_string(),
        };
        let memory_hint = match memory_hint {
            Ok(Ok(hint)) => hint,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "memory recall failed");
                String::new()
            }
            Err(_) => String::new(),
        };

        let sub_tasks =
            until_cancelled(cancel, self.services.extractor.extract_sub_tasks(&translated))
                .await??;
        let mut tasks: Vec<Task> = sub_tasks
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .enumerate()
            .map(|(i, t)| Task::new(i, t))
            .collect();
        if tasks.is_empty() {
            tasks.push(Task::new(0, translated.clone()));
        }
        tracing::info!(tasks = tasks.len(), concurrent = self.options.concurrent, "tasks extracted");

        let runs = self.execute_tasks(&tasks, user_id, cancel).await;
        let intents: Vec<String> = runs.iter().filter_map(|r| r.intent.clone()).collect();
        let outcomes: Vec<Outcome> = runs.into_iter().map(|r| r.outcome).collect();

        // 先查历史使用次数，再写入本次活动，提示结果与后台写入的时序无关
        let auto_tip = until_cancelled(cancel, self.usage_tip(user_id, &intents))
            .await
            .unwrap_or_default();

        self.spawn_side_effects(user_id, raw, &translated, &tasks, &intents, &emotion);

        let suggestions =
            match until_cancelled(cancel, self.services.suggester.suggest_skills(&translated)).await {
                Ok(Ok(suggestions)) => suggestions,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "skill suggestion failed");
                    Vec::new()
                }
                Err(_) => Vec::new(),
            };

        let report = Report::aggregate(
            outcomes,
            suggestions,
            Trailer {
                emotion,
                memory_hint,
                auto_tip,
            },
        );
        tracing::info!(
            ok = report.outcomes().iter().filter(|o| o.is_success()).count(),
            failed = report.outcomes().iter().filter(|o| o.is_error()).count(),
            fallback = report.outcomes().iter().filter(|o| o.is_fallback()).count(),
            cancelled = report.outcomes().iter().filter(|o| o.is_cancelled()).count(),
            "request handled"
        );
        Ok(report)
    }

    /// 顺序或有界并发执行；并发时按任务顺序缓冲结果
    async fn execute_tasks(
        &self,
        tasks: &[Task],
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Vec<TaskRun> {
        if self.options.concurrent && tasks.len() > 1 {
            // 先装箱再成流：闭包返回的匿名 future 会让外层 future 无法证明 Send
            let runs: Vec<BoxFuture<'_, TaskRun>> = tasks
                .iter()
                .map(|t| self.run_task(t, user_id, cancel).boxed())
                .collect();
            stream::iter(runs)
                .buffered(self.options.max_concurrent_tasks)
                .collect()
                .await
        } else {
            let mut runs = Vec::with_capacity(tasks.len());
            for task in tasks {
                runs.push(self.run_task(task, user_id, cancel).await);
            }
            runs
        }
    }

    /// 单任务状态机：Pending -> Resolving -> Resolved | Unresolved -> Executed
    ///
    /// 任务启动前（含意图抽取）取消产出 Cancelled；降级生成在取消时放弃；
    /// 已开始的技能调用跑完，由技能调用超时兜底。
    async fn run_task(&self, task: &Task, user_id: &str, cancel: &CancellationToken) -> TaskRun {
        let cancelled = TaskRun {
            intent: None,
            outcome: Outcome::Cancelled,
        };
        tracing::debug!(task = task.index, phase = ?TaskPhase::Pending);
        if cancel.is_cancelled() {
            tracing::debug!(task = task.index, "cancelled before start");
            return cancelled;
        }

        tracing::debug!(task = task.index, phase = ?TaskPhase::Resolving);
        let intent = match until_cancelled(cancel, self.services.extractor.extract_intent(&task.text)).await {
            Err(_) => return cancelled,
            Ok(Ok(intent)) if !intent.trim().is_empty() => intent.trim().to_string(),
            Ok(Ok(_)) => task.text.clone(),
            Ok(Err(e)) => {
                tracing::warn!(task = task.index, error = %e, "intent extraction failed, using task text");
                task.text.clone()
            }
        };

        let outcome = match self
            .resolver
            .resolve(&intent)
            .and_then(|id| self.registry.lookup(&id))
        {
            Some(entry) => {
                tracing::debug!(
                    task = task.index,
                    phase = ?TaskPhase::Resolved,
                    skill = %entry.id,
                    timeout_ms = self.invoker.timeout().as_millis() as u64
                );
                match self.invoker.invoke(entry, &task.text, user_id).await {
                    Ok(text) => Outcome::Success {
                        intent: intent.clone(),
                        skill_id: entry.id.clone(),
                        text,
                    },
                    Err(error) => {
                        tracing::warn!(task = task.index, skill = %entry.id, error = %error, "skill failed");
                        Outcome::SkillError {
                            skill_id: entry.id.clone(),
                            error,
                        }
                    }
                }
            }
            None => {
                tracing::debug!(task = task.index, phase = ?TaskPhase::Unresolved, intent = %intent);
                match until_cancelled(cancel, self.fallback.synthesize(&task.text, &intent)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::debug!(task = task.index, "fallback abandoned");
                        return cancelled;
                    }
                }
            }
        };
        tracing::debug!(task = task.index, phase = ?TaskPhase::Executed);

        TaskRun {
            intent: Some(intent),
            outcome,
        }
    }

    /// 高频意图提示：历史次数加本次出现次数达到阈值的第一个意图
    async fn usage_tip(&self, user_id: &str, intents: &[String]) -> Option<String> {
        if self.options.usage_tip_threshold == 0 {
            return None;
        }
        let mut in_request: HashMap<&str, usize> = HashMap::new();
        for intent in intents {
            *in_request.entry(intent.as_str()).or_default() += 1;
        }
        for intent in intents {
            let prior = match self.services.activity.intent_usage(user_id, intent).await {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(error = %e, "usage lookup failed");
                    return None;
                }
            };
            let total = prior + in_request.get(intent.as_str()).copied().unwrap_or(0);
            if total >= self.options.usage_tip_threshold {
                return Some(format!(
                    "🔔 Suggestion: You've used \"{}\" often. Want to automate it?",
                    intent
                ));
            }
        }
        None
    }

    /// 活动日志、通知、记忆写入：后台执行，不阻塞响应，失败只告警
    fn spawn_side_effects(
        &self,
        user_id: &str,
        raw: &str,
        translated: &str,
        tasks: &[Task],
        intents: &[String],
        emotion: &str,
    ) {
        let record = ActivityRecord {
            user_id: user_id.to_string(),
            raw_input: raw.to_string(),
            tasks: tasks.iter().map(|t| t.text.clone()).collect(),
            intents: intents.to_vec(),
            emotion: emotion.to_string(),
            timestamp: Utc::now(),
        };
        let activity = Arc::clone(&self.services.activity);
        tokio::spawn(async move {
            if let Err(e) = activity.log_activity(record).await {
                tracing::warn!(error = %e, "activity log failed");
            }
        });

        let notification = Notification {
            title: "✅ Command Processed".to_string(),
            message: format!("{} task(s) completed successfully.", tasks.len()),
        };
        let notifier = Arc::clone(&self.services.notifier);
        let user = user_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify_user(&user, &notification).await {
                tracing::warn!(error = %e, "notification failed");
            }
        });

        let memory = Arc::clone(&self.services.memory);
        let user = user_id.to_string();
        let text = translated.to_string();
        tokio::spawn(async move {
            if let Err(e) = memory.remember(&user, &text).await {
                tracing::warn!(error = %e, "memory write failed");
            }
        });
    }
}

/// 取消令牌触发时放弃等待中的外部调用
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, OrchestratorError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(OrchestratorError::Cancelled),
        v = fut => Ok(v),
    }
}
