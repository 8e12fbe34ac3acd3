//! 核心编排层：错误类型、任务与结果、报告聚合、降级合成、请求监管、技能并发池、主控流水线

pub mod builder;
pub mod error;
pub mod fallback;
pub mod orchestrator;
pub mod outcome;
pub mod report;
pub mod session_supervisor;
pub mod shutdown;
pub mod task_scheduler;

pub use builder::{build_orchestrator, create_llm_from_config, OrchestratorBuilder};
pub use error::{CollaboratorError, OrchestratorError, SkillFailure};
pub use fallback::FallbackSynthesizer;
pub use orchestrator::{Orchestrator, OrchestratorOptions};
pub use outcome::{Outcome, Task, TaskPhase};
pub use report::{Report, Trailer};
pub use session_supervisor::SessionSupervisor;
pub use shutdown::ShutdownManager;
pub use task_scheduler::TaskScheduler;
