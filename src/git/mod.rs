pub mod cli;
pub mod types;

#[cfg(test)]
pub mod mock;


pub use cli::{GitCli, Vcs};
pub use types::{local_ref, remote_ref, BranchRef, Checkout, CommitInfo};
