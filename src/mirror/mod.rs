pub mod plan;
pub mod report;
pub mod synchronizer;


pub use plan::{plan_commit, CommitPlan};
pub use report::{BranchOutcome, Outcome, Report};
pub use synchronizer::{Session, Synchronizer};
