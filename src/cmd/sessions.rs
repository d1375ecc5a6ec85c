use anyhow::Result;
use clap::Parser;

use crate::booth::Booth;
use crate::cmd::SubCommandExtend;
use crate::config::{Opts, OutputFormat};

#[derive(Parser, Debug, Clone)]
pub struct SessionsCommand {}

impl SubCommandExtend for SessionsCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let booth = Booth::new(&opts.conf_dir, opts.metric, Default::default()).await?;
        let sessions = booth.list_sessions().await?;

        match opts.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sessions)?),
            OutputFormat::Table => {
                for s in &sessions {
                    println!(
                        "{}\t{} images\t{} strips\t{}",
                        s.session_id,
                        s.image_count,
                        s.strip_count,
                        s.latest_timestamp.as_deref().unwrap_or("-"),
                    );
                }
            }
        }
        Ok(())
    }
}
