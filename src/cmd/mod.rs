mod ingest;
mod sessions;
mod show;
mod similar;
mod strip;

pub use ingest::*;
pub use sessions::*;
pub use show::*;
pub use similar::*;
pub use strip::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
