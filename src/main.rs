use clap::Parser;
use console::style;

use doclens::cli::{self, Cli};
use doclens::error::{DoclensError, ErrorKind};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = cli::run(cli).await {
        eprintln!("{} {err:#}", style("error:").red().bold());
        std::process::exit(exit_code(&err));
    }
}

/// Distinct exit codes for conditions scripts commonly branch on.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<DoclensError>().map(DoclensError::kind) {
        Some(ErrorKind::NotReady | ErrorKind::NotFound) => 3,
        Some(ErrorKind::Busy) => 4,
        Some(ErrorKind::Config) => 2,
        _ => 1,
    }
}
