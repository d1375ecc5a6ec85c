use anyhow::Result;
use clap::Parser;

use crate::booth::Booth;
use crate::cmd::SubCommandExtend;
use crate::config::{Opts, OutputFormat};

#[derive(Parser, Debug, Clone)]
pub struct SimilarCommand {
    /// 目标 artifact 的 ID
    pub id: String,
    /// 返回的结果数量
    #[arg(short = 'n', long, default_value_t = 5)]
    pub count: usize,
}

impl SubCommandExtend for SimilarCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let booth = Booth::new(&opts.conf_dir, opts.metric, Default::default()).await?;
        let result = booth.find_similar(&self.id, self.count).await?;

        match opts.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
            OutputFormat::Table => {
                for m in &result {
                    println!("{:.4}\t{}\t{}", m.similarity, m.id, m.applied_filters.join(","));
                }
            }
        }
        Ok(())
    }
}
