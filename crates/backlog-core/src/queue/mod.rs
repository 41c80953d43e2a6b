//! Queue module: storage, selection, single-flight runs, and the facade.
//!
//! Layering, leaves first:
//! - `QueueStorage` keeps the inventory and the per-task records.
//! - `QueryRunner` picks the next task of a pass.
//! - `RunRequestManager` lets at most one pass run.
//! - `QueueRunRequest` is the pass itself.
//! - `BackgroundQueue` ties them together for callers.

mod background;
mod query;
mod request_manager;
mod run_request;
mod storage;
mod timer;

pub use background::BackgroundQueue;
pub use query::QueryRunner;
pub use request_manager::{RunCallback, RunRequestManager};
pub use run_request::QueueRunRequest;
pub use storage::{CreatedTask, QueueStorage, TaskRead};
pub use timer::SingleScheduleTimer;
