// Server polling: per-cycle pipeline and the scheduler that drives it

pub mod poller;
pub mod scheduler;

pub use poller::{
    BatchOutcome, CyclePhase, CycleReport, IngestDeps, RoleFailure, RoleReport, ServerPoller,
};
pub use scheduler::IngestScheduler;
