use clap::Parser;
use clap::Subcommand;
use commands::status::Status;
use commands::sync::SyncBranches;
use std::path::PathBuf;

mod commands;
mod config;
mod errors;
mod filter;
mod git;
mod mirror;
mod protected;

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "git-mirror")]
#[command(about = "Mirror every upstream branch into a fork, keeping the fork's workflows", long_about = None)]
struct Cli {
    /// Repository to work in
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Sync(SyncBranches),
    Status(Status),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();

    let result = match args.command.unwrap_or(Commands::Sync(SyncBranches::default())) {
        Commands::Sync(sync) => sync.execute(&args.repo),
        Commands::Status(status) => status.execute(&args.repo),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
