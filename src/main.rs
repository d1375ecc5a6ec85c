use anyhow::Result;
use clap::Parser;

use photobooth::cmd::SubCommandExtend;
use photobooth::config::{Opts, SubCommand};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let opts = Opts::parse();
    match &opts.subcmd {
        SubCommand::Ingest(cmd) => cmd.run(&opts).await,
        SubCommand::Strip(cmd) => cmd.run(&opts).await,
        SubCommand::Similar(cmd) => cmd.run(&opts).await,
        SubCommand::Show(cmd) => cmd.run(&opts).await,
        SubCommand::Sessions(cmd) => cmd.run(&opts).await,
    }
}
