use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::booth::Booth;
use crate::cmd::SubCommandExtend;
use crate::config::{Opts, OutputFormat};

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// artifact 的 ID
    pub id: String,
    /// 图片的输出路径，缺省时只打印元数据
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl SubCommandExtend for ShowCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let booth = Booth::new(&opts.conf_dir, opts.metric, Default::default()).await?;
        let artifact = booth.get_artifact(&self.id).await?;

        if let Some(output) = &self.output {
            fs::write(output, &artifact.image)?;
            info!("图片已写入 {}", output.display());
        }

        match opts.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&artifact)?),
            OutputFormat::Table => {
                println!(
                    "{}\t{}\t{}x{}\t{}\t{}",
                    artifact.id,
                    artifact.kind.as_str(),
                    artifact.width,
                    artifact.height,
                    artifact.session_id,
                    artifact.timestamp,
                );
            }
        }
        Ok(())
    }
}
