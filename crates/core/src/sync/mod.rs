//! Directory copy, sync and batch delete

mod engine;
mod plan;

pub use engine::DirSync;
pub use plan::{
    Direction, PlanEntry, SyncAction, SyncMode, SyncOptions, SyncPlan, SyncReport,
    TransferFailure, plan_entries,
};
