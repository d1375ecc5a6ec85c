use serde::{Deserialize, Serialize};

/// 索引里持久化的一行 artifact 记录
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArtifactRecord {
    /// artifact ID，调用方负责唯一性，重复时静默覆盖
    pub id: String,
    /// 512 维特征向量，小端 f32 编码
    pub vector: Vec<u8>,
    /// 描述文本
    pub document: String,
    /// 元数据 JSON（[`ArtifactMeta`]）
    pub metadata: String,
    /// 渲染后的图片字节（单张为 PNG，拼条为 JPEG）
    pub image: Vec<u8>,
}

/// 最近邻扫描用的轻量行，只取 ID 和向量
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<u8>,
}

/// artifact 类型标签，元数据缺失该字段时按单张照片处理
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    #[default]
    Single,
    Strip,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Strip => "strip",
        }
    }
}

/// 元数据 JSON 的结构。创建后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub id: String,
    pub session_id: String,
    /// UTC 时间戳，固定宽度格式，字典序即时间序
    pub timestamp: String,
    /// 上传时的文件名
    #[serde(default)]
    pub filename: Option<String>,
    /// 实际生效的滤镜规范名，按应用顺序
    #[serde(default)]
    pub filters_applied: Vec<String>,
    pub width: u32,
    pub height: u32,
    /// 上传的原始字节数（拼条为编码后的字节数）
    pub file_size: u64,
    #[serde(default, rename = "type")]
    pub kind: ArtifactKind,
    /// 拼条包含的照片数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_count: Option<u32>,
}
