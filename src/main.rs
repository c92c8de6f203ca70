mod cli;
mod error;
mod gateway;
mod generation;
mod history;
mod logging;
mod model;
mod observable;
mod orchestrator;
mod publish;
mod session;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let target = if args.is_interactive() {
        logging::LogTarget::File(args.log_file.as_deref())
    } else {
        logging::LogTarget::Stderr
    };
    logging::init(target, args.verbose)?;

    cli::run(args).await
}
