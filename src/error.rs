use thiserror::Error;

/// 错误的机器可区分类别，对应校验、处理、未找到三类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Processing,
    NotFound,
}

/// 所有核心操作的错误类型。
/// 唯一被静默吞掉的情况是未知滤镜名（按文档跳过），其余错误一律向上传播。
#[derive(Debug, Error)]
pub enum BoothError {
    /// 上传内容无法解码为图片
    #[error("not an image: {0}")]
    InvalidImage(#[source] image::ImageError),
    /// 拼条至少需要一张照片
    #[error("photo strip requires at least one photo")]
    EmptyStrip,
    /// 会话内没有可用的照片
    #[error("no images found for session {0}")]
    EmptySession(String),
    /// 未知的 artifact ID
    #[error("artifact not found: {0}")]
    NotFound(String),
    /// 记录存在但没有图片数据
    #[error("artifact {0} has no image data")]
    MissingImageData(String),
    /// 图片编解码阶段的失败
    #[error("image processing failed: {0}")]
    Processing(#[from] image::ImageError),
    /// 索引存储层的失败
    #[error("index store failure: {0}")]
    Store(#[from] sqlx::Error),
    /// 元数据序列化失败
    #[error("metadata encoding failed: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
}

impl BoothError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidImage(_) | Self::EmptyStrip => ErrorCategory::Validation,
            Self::EmptySession(_) | Self::NotFound(_) | Self::MissingImageData(_) => {
                ErrorCategory::NotFound
            }
            Self::Processing(_) | Self::Store(_) | Self::Metadata(_) | Self::Io(_) => {
                ErrorCategory::Processing
            }
        }
    }
}

pub type Result<T, E = BoothError> = std::result::Result<T, E>;
