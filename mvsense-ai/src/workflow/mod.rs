//! Trigger-driven analysis workflow
//!
//! The bus listener dispatches triggers; a single worker drains them and
//! drives `PipelineOrchestrator` one run at a time.

pub mod dispatcher;
pub mod orchestrator;
pub mod shutdown;

pub use dispatcher::{run_worker, DispatchOutcome, Trigger, TriggerDispatcher};
pub use orchestrator::{PipelineOrchestrator, RunReport, RunState};
pub use shutdown::ServiceTasks;
