use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::booth::{Booth, ColorMode, StripStyle};
use crate::cmd::SubCommandExtend;
use crate::config::{FilterOptions, Opts, OutputFormat};
use crate::filter::{FilterKind, FrameStyle};

#[derive(Parser, Debug, Clone)]
pub struct StripCommand {
    /// 会话 ID
    pub session: String,
    /// 每张照片的色彩模式
    #[arg(long, value_enum, default_value_t = ColorMode::Color)]
    pub color_mode: ColorMode,
    /// 相框样式
    #[arg(long, value_enum, default_value_t = FrameStyle::Classic)]
    pub frame: FrameStyle,
    /// 合成前对每张照片附加的滤镜
    #[arg(long, value_parser = parse_filter)]
    pub effect: Option<FilterKind>,
    /// 拼条 JPEG 的输出路径
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub filter_opts: FilterOptions,
}

fn parse_filter(s: &str) -> Result<FilterKind, String> {
    FilterKind::parse(s).ok_or_else(|| format!("未知滤镜: {s}"))
}

impl SubCommandExtend for StripCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let booth = Booth::new(&opts.conf_dir, opts.metric, self.filter_opts).await?;
        let style = StripStyle {
            color_mode: self.color_mode,
            frame: self.frame,
            effect: self.effect,
        };
        let receipt = booth.compose_strip(&self.session, style).await?;

        if let Some(output) = &self.output {
            fs::write(output, &receipt.image)?;
            info!("拼条已写入 {}", output.display());
        }

        match opts.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&receipt)?),
            OutputFormat::Table => {
                println!("{}\t{}\t{} photos", receipt.strip_id, receipt.session_id, receipt.image_count)
            }
        }
        Ok(())
    }
}
