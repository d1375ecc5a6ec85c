use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;
use regex::Regex;
use tokio::task::spawn_blocking;
use walkdir::WalkDir;

use crate::booth::{Booth, PreparedArtifact, new_session_id};
use crate::cmd::SubCommandExtend;
use crate::config::{FilterOptions, Opts, OutputFormat};

#[derive(Parser, Debug, Clone)]
pub struct IngestCommand {
    /// 图片或目录的路径
    pub path: PathBuf,
    /// 逗号分隔的滤镜名，未知名字会被静默跳过
    #[arg(short = 'F', long, value_delimiter = ',')]
    pub filters: Vec<String>,
    /// 会话 ID，缺省时新建会话
    #[arg(short, long)]
    pub session: Option<String>,
    /// 目录扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(long, default_value = "jpg,jpeg,png")]
    pub suffix: String,
    #[command(flatten)]
    pub filter_opts: FilterOptions,
}

impl SubCommandExtend for IngestCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let re = Regex::new(&self.suffix.replace(',', "|")).expect("failed to build regex");
        let booth = Arc::new(Booth::new(&opts.conf_dir, opts.metric, self.filter_opts).await?);
        let session = self.session.clone().unwrap_or_else(new_session_id);

        // 收集所有符合条件的文件
        let entries: Vec<PathBuf> = if self.path.is_dir() {
            WalkDir::new(&self.path)
                .into_iter()
                .filter_map(|entry| {
                    entry.ok().and_then(|entry| {
                        let path = entry.path().to_path_buf();
                        let matched = path.is_file()
                            && re.is_match(&path.extension().unwrap_or_default().to_string_lossy());
                        matched.then_some(path)
                    })
                })
                .collect()
        } else {
            vec![self.path.clone()]
        };
        info!("共 {} 张待处理图片", entries.len());

        let pb_style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap()
            .progress_chars("#>-");
        let pb = ProgressBar::new(entries.len() as u64)
            .with_style(pb_style)
            .with_message("处理图片中...");

        // NOTE: 像素处理是纯 CPU 计算，放进 rayon；索引写入留在异步侧
        let (tx, mut rx) = tokio::sync::mpsc::channel::<(PathBuf, PreparedArtifact)>(num_cpus::get());

        let producer = spawn_blocking({
            let booth = booth.clone();
            let session = session.clone();
            let filters = self.filters.clone();
            let pb = pb.clone();
            move || {
                entries.into_par_iter().progress_with(pb.clone()).for_each(|path| {
                    let result = fs::read(&path).map_err(anyhow::Error::from).and_then(|bytes| {
                        let filename = path.file_name().map(|s| s.to_string_lossy().into_owned());
                        booth
                            .prepare(&bytes, &filters, &session, filename)
                            .map_err(anyhow::Error::from)
                    });
                    match result {
                        Ok(prepared) => tx.blocking_send((path, prepared)).unwrap(),
                        Err(e) => pb.println(format!("处理失败: {}: {}", path.display(), e)),
                    }
                })
            }
        });

        let consumer = tokio::spawn({
            let booth = booth.clone();
            let pb = pb.clone();
            let format = opts.format;
            async move {
                let mut receipts = vec![];
                while let Some((path, prepared)) = rx.recv().await {
                    match booth.commit(prepared).await {
                        Ok(receipt) => {
                            if let OutputFormat::Table = format {
                                pb.println(format!("[OK] {} {}", receipt.id, path.display()));
                            }
                            receipts.push(receipt);
                        }
                        Err(e) => pb.println(format!("入库失败: {}: {}", path.display(), e)),
                    }
                }
                receipts
            }
        });

        let (_, receipts) = tokio::try_join!(producer, consumer)?;
        pb.finish_with_message("图片处理完成");

        match opts.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&receipts)?),
            OutputFormat::Table => println!("session: {session}"),
        }
        Ok(())
    }
}
