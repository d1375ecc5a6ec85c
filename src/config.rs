use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;

use crate::cmd::*;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "", "photobooth").expect("failed to get project dir");
    ConfDir { path: proj_dirs.data_dir().to_path_buf() }
});

fn default_conf_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap()
}

/// 滤镜管线的可调参数，grain/glitter/做旧划痕的随机性全部来自这里注入的种子
#[derive(Parser, Debug, Clone, Copy)]
pub struct FilterOptions {
    /// 高斯模糊的 sigma，柔和档约 0.7，默认为强档
    #[arg(long, value_name = "SIGMA", default_value_t = 2.0)]
    pub blur_sigma: f32,
    /// 胶片颗粒的噪声幅度，每个通道叠加 ±N 内的均匀整数
    #[arg(long, value_name = "N", default_value_t = 12, value_parser = clap::value_parser!(i32).range(1..=64))]
    pub grain_amount: i32,
    /// 随机数种子，固定后 grain/glitter/划痕逐字节可复现
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self { blur_sigma: 2.0, grain_amount: 12, seed: None }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "photobooth", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// photobooth 数据目录
    #[arg(short, long, default_value = default_conf_dir())]
    pub conf_dir: ConfDir,
    /// 特征向量的距离度量
    #[arg(long, value_enum, default_value_t = Metric::L2)]
    pub metric: Metric,
    /// 输出格式
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 上传并处理图片，写入相似度索引
    Ingest(IngestCommand),
    /// 把会话内的照片合成拼条
    Strip(StripCommand),
    /// 搜索与指定 artifact 相似的图片
    Similar(SimilarCommand),
    /// 导出指定 artifact 的图片与元数据
    Show(ShowCommand),
    /// 列出所有会话及统计
    Sessions(SessionsCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("photobooth.db")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

/// 向量距离度量，相似度统一按 1 - 距离 报告
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// 欧氏距离
    L2,
    /// 余弦距离
    Cosine,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}
