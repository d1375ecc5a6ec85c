use std::io::Cursor;

use chrono::Utc;
use clap::ValueEnum;
use image::RgbImage;
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Serialize;
use tokio::task::block_in_place;
use uuid::Uuid;

use crate::config::{ConfDir, FilterOptions, Metric};
use crate::db::{ArtifactKind, ArtifactMeta};
use crate::error::{BoothError, Result};
use crate::feature;
use crate::filter::{self, FilterKind, FrameStyle};
use crate::index::{IndexEntry, SimilarityIndex};
use crate::session::{self, SessionSummary};
use crate::strip::{self, STRIP_HEIGHT, STRIP_WIDTH, StripCompositor};

/// 拼条中每张照片的色彩模式
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorMode {
    #[default]
    Color,
    /// 合成前对每张照片套黑白滤镜
    Bw,
}

/// 拼条合成参数
#[derive(Debug, Clone, Copy, Default)]
pub struct StripStyle {
    pub color_mode: ColorMode,
    pub frame: FrameStyle,
    /// 合成前对每张照片附加的滤镜
    pub effect: Option<FilterKind>,
}

/// ingest 的回执
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub id: String,
    pub session_id: String,
    pub applied_filters: Vec<String>,
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    pub timestamp: String,
    /// 处理后的 PNG 字节，不进入 JSON 输出
    #[serde(skip)]
    pub image: Vec<u8>,
}

/// compose_strip 的回执
#[derive(Debug, Clone, Serialize)]
pub struct StripReceipt {
    pub strip_id: String,
    pub session_id: String,
    pub image_count: u32,
    pub timestamp: String,
    /// 拼条 JPEG 字节，不进入 JSON 输出
    #[serde(skip)]
    pub image: Vec<u8>,
}

/// 相似检索的一条结果
#[derive(Debug, Clone, Serialize)]
pub struct SimilarMatch {
    pub id: String,
    /// 1 - 距离
    pub similarity: f32,
    pub applied_filters: Vec<String>,
    pub timestamp: String,
    pub session_id: String,
}

/// 导出的 artifact
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub id: String,
    pub filename: Option<String>,
    pub applied_filters: Vec<String>,
    pub timestamp: String,
    pub session_id: String,
    pub width: u32,
    pub height: u32,
    pub kind: ArtifactKind,
    #[serde(skip)]
    pub image: Vec<u8>,
}

/// 预处理完毕、尚未写入索引的 artifact。
/// prepare 是纯 CPU 计算，commit 才落库，所以失败的请求不会留下半成品
pub struct PreparedArtifact {
    meta: ArtifactMeta,
    vector: Vec<f32>,
    document: String,
    image: Vec<u8>,
}

/// 整个系统的显式入口句柄：持有相似度索引和滤镜配置。
/// 索引不是进程级单例，随句柄创建、随句柄丢弃
pub struct Booth {
    index: SimilarityIndex,
    filters: FilterOptions,
}

impl Booth {
    pub async fn new(conf_dir: &ConfDir, metric: Metric, filters: FilterOptions) -> Result<Self> {
        std::fs::create_dir_all(conf_dir.path())?;
        let index = SimilarityIndex::open(&conf_dir.database(), metric).await?;
        Ok(Self { index, filters })
    }

    /// 内存索引，测试用
    pub async fn in_memory(metric: Metric, filters: FilterOptions) -> Result<Self> {
        let index = SimilarityIndex::open_in_memory(metric).await?;
        Ok(Self { index, filters })
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    /// 解码、滤镜、特征提取与编码。纯计算，不触碰索引
    pub fn prepare(
        &self,
        bytes: &[u8],
        filter_names: &[String],
        session_id: &str,
        filename: Option<String>,
    ) -> Result<PreparedArtifact> {
        let decoded = image::load_from_memory(bytes).map_err(BoothError::InvalidImage)?;
        let photo = decoded.to_rgb8();

        let mut rng = self.rng();
        let (processed, applied) = filter::apply_filters(photo, filter_names, &self.filters, &mut rng);

        let (width, height) = processed.dimensions();
        let vector = feature::extract(&processed);
        let image = encode_png(&processed)?;

        let meta = ArtifactMeta {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            timestamp: now_timestamp(),
            filename,
            filters_applied: applied,
            width,
            height,
            file_size: bytes.len() as u64,
            kind: ArtifactKind::Single,
            image_count: None,
        };
        let document = describe_single(&meta);
        Ok(PreparedArtifact { meta, vector, document, image })
    }

    /// 把预处理结果写入索引并生成回执
    pub async fn commit(&self, prepared: PreparedArtifact) -> Result<IngestReceipt> {
        let PreparedArtifact { meta, vector, document, image } = prepared;
        self.index.add(&meta.id, &vector, &document, &meta, &image).await?;
        debug!("artifact {} 已入库（会话 {}）", meta.id, meta.session_id);
        Ok(IngestReceipt {
            id: meta.id,
            session_id: meta.session_id,
            applied_filters: meta.filters_applied,
            width: meta.width,
            height: meta.height,
            file_size: meta.file_size,
            timestamp: meta.timestamp,
            image,
        })
    }

    /// 上传一张照片：滤镜、特征提取、入索引。
    /// 不给会话 ID 时新建会话
    pub async fn ingest(
        &self,
        bytes: &[u8],
        filter_names: &[String],
        session_id: Option<String>,
        filename: Option<String>,
    ) -> Result<IngestReceipt> {
        let session_id = session_id.unwrap_or_else(new_session_id);
        let prepared = block_in_place(|| self.prepare(bytes, filter_names, &session_id, filename))?;
        self.commit(prepared).await
    }

    /// 把会话内的照片合成拼条，拼条本身也作为新 artifact 入索引。
    /// 只取该会话的单张照片（拼条不会再进拼条），按时间戳升序填充前 4 个槽位
    pub async fn compose_strip(&self, session_id: &str, style: StripStyle) -> Result<StripReceipt> {
        let mut entries = self
            .index
            .filter_by_meta(|meta| {
                meta.session_id == session_id && meta.kind == ArtifactKind::Single
            })
            .await?;
        if entries.is_empty() {
            return Err(BoothError::EmptySession(session_id.to_string()));
        }
        entries.sort_by(|a, b| a.meta.timestamp.cmp(&b.meta.timestamp));
        entries.truncate(strip::SLOT_COUNT);

        let timestamp = now_timestamp();
        let date_text = Utc::now().format("%Y-%m-%d %H:%M").to_string();

        let (vector, jpeg, image_count) = block_in_place(|| -> Result<_> {
            // 每张照片的预处理互不依赖，可并行
            let photos = entries
                .par_iter()
                .map(|entry| self.load_strip_photo(entry, style))
                .collect::<Result<Vec<_>>>()?;

            let mut rng = self.rng();
            let compositor = StripCompositor::new();
            let image = compositor.compose(&photos, style.frame, &date_text, &mut rng)?;
            let vector = feature::extract(&image);
            let jpeg = strip::encode_jpeg(&image)?;
            Ok((vector, jpeg, photos.len() as u32))
        })?;

        let meta = ArtifactMeta {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            timestamp: timestamp.clone(),
            filename: None,
            filters_applied: vec![],
            width: STRIP_WIDTH,
            height: STRIP_HEIGHT,
            file_size: jpeg.len() as u64,
            kind: ArtifactKind::Strip,
            image_count: Some(image_count),
        };
        let document =
            format!("Photostrip for session {session_id} containing {image_count} images");
        self.index.add(&meta.id, &vector, &document, &meta, &jpeg).await?;
        info!("会话 {session_id} 的拼条 {} 已生成（{image_count} 张照片）", meta.id);

        Ok(StripReceipt {
            strip_id: meta.id,
            session_id: meta.session_id,
            image_count,
            timestamp,
            image: jpeg,
        })
    }

    /// 以指定 artifact 的向量为查询，返回最相似的 limit 条（不含其自身）
    pub async fn find_similar(&self, id: &str, limit: usize) -> Result<Vec<SimilarMatch>> {
        let entry = self
            .index
            .get(id)
            .await?
            .ok_or_else(|| BoothError::NotFound(id.to_string()))?;
        let neighbors = self.index.query(&entry.vector, limit, Some(id)).await?;
        Ok(neighbors
            .into_iter()
            .map(|n| SimilarMatch {
                id: n.entry.id,
                similarity: 1.0 - n.distance,
                applied_filters: n.entry.meta.filters_applied,
                timestamp: n.entry.meta.timestamp,
                session_id: n.entry.meta.session_id,
            })
            .collect())
    }

    /// 按 ID 导出 artifact
    pub async fn get_artifact(&self, id: &str) -> Result<Artifact> {
        let entry = self
            .index
            .get(id)
            .await?
            .ok_or_else(|| BoothError::NotFound(id.to_string()))?;
        if entry.image.is_empty() {
            return Err(BoothError::MissingImageData(id.to_string()));
        }
        Ok(Artifact {
            id: entry.id,
            filename: entry.meta.filename,
            applied_filters: entry.meta.filters_applied,
            timestamp: entry.meta.timestamp,
            session_id: entry.meta.session_id,
            width: entry.meta.width,
            height: entry.meta.height,
            kind: entry.meta.kind,
            image: entry.image,
        })
    }

    /// 列出所有会话统计
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let metas = self.index.get_all_meta().await?;
        Ok(session::group_by_session(metas.iter()))
    }

    /// 解码库内照片并套用拼条级的色彩模式与附加滤镜
    fn load_strip_photo(&self, entry: &IndexEntry, style: StripStyle) -> Result<RgbImage> {
        let decoded = image::load_from_memory(&entry.image)?;
        let photo = decoded.to_rgb8();

        let mut names = Vec::new();
        if style.color_mode == ColorMode::Bw {
            names.push(FilterKind::BlackWhite.name().to_string());
        }
        if let Some(effect) = style.effect {
            names.push(effect.name().to_string());
        }
        let mut rng = self.rng();
        let (photo, _) = filter::apply_filters(photo, &names, &self.filters, &mut rng);
        Ok(photo)
    }

    fn rng(&self) -> StdRng {
        match self.filters.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

/// 会话 ID 与 artifact ID 同一套 UUID 方案
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// 固定宽度的 UTC 时间戳，字典序即时间序
fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn describe_single(meta: &ArtifactMeta) -> String {
    let filters = if meta.filters_applied.is_empty() {
        "none".to_string()
    } else {
        meta.filters_applied.join(", ")
    };
    format!(
        "Image {} with filters: {}, size: ({}, {}), taken at {}",
        meta.filename.as_deref().unwrap_or("upload"),
        filters,
        meta.width,
        meta.height,
        meta.timestamp
    )
}

fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, image::ImageFormat::Png)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorCategory;

    use super::*;

    fn png_bytes(w: u32, h: u32, color: [u8; 3]) -> Vec<u8> {
        encode_png(&RgbImage::from_pixel(w, h, image::Rgb(color))).unwrap()
    }

    fn seeded_opts() -> FilterOptions {
        FilterOptions { seed: Some(9), ..FilterOptions::default() }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ingest_records_applied_filters_only() {
        let booth = Booth::in_memory(Metric::L2, seeded_opts()).await.unwrap();
        let receipt = booth
            .ingest(
                &png_bytes(100, 100, [255, 0, 0]),
                &["sparkle".to_string(), "bw".to_string()],
                Some("s1".to_string()),
                Some("red.png".to_string()),
            )
            .await
            .unwrap();

        // 未知滤镜静默跳过，只记录识别出的规范名
        assert_eq!(receipt.applied_filters, vec!["black_white"]);
        assert_eq!((receipt.width, receipt.height), (100, 100));
        assert_eq!(receipt.session_id, "s1");

        // 处理后的图片是纯灰：R=G=B=76
        let stored = booth.get_artifact(&receipt.id).await.unwrap();
        let decoded = image::load_from_memory(&stored.image).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(50, 50).0, [76, 76, 76]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ingest_rejects_garbage_bytes() {
        let booth = Booth::in_memory(Metric::L2, seeded_opts()).await.unwrap();
        let err = booth.ingest(b"definitely not an image", &[], None, None).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn strip_from_single_photo_session() {
        let booth = Booth::in_memory(Metric::L2, seeded_opts()).await.unwrap();
        booth
            .ingest(&png_bytes(64, 48, [200, 40, 40]), &[], Some("party".to_string()), None)
            .await
            .unwrap();

        let receipt = booth.compose_strip("party", StripStyle::default()).await.unwrap();
        assert_eq!(receipt.image_count, 1);

        // 拼条作为新 artifact 入库，尺寸为固定画布
        let stored = booth.get_artifact(&receipt.strip_id).await.unwrap();
        assert_eq!(stored.kind, ArtifactKind::Strip);
        let decoded = image::load_from_memory(&stored.image).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (STRIP_WIDTH, STRIP_HEIGHT));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn strip_of_empty_session_is_not_found() {
        let booth = Booth::in_memory(Metric::L2, seeded_opts()).await.unwrap();
        let err = booth.compose_strip("ghost", StripStyle::default()).await.unwrap_err();
        assert!(matches!(&err, BoothError::EmptySession(s) if s == "ghost"));
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn find_similar_never_returns_target() {
        let booth = Booth::in_memory(Metric::L2, seeded_opts()).await.unwrap();
        // 三张近乎相同的图片
        let a = booth
            .ingest(&png_bytes(32, 32, [250, 10, 10]), &[], Some("s".to_string()), None)
            .await
            .unwrap();
        booth
            .ingest(&png_bytes(32, 32, [249, 10, 10]), &[], Some("s".to_string()), None)
            .await
            .unwrap();
        booth
            .ingest(&png_bytes(32, 32, [245, 10, 10]), &[], Some("s".to_string()), None)
            .await
            .unwrap();

        let matches = booth.find_similar(&a.id, 2).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.id != a.id));
        // 距离升序，相似度降序
        assert!(matches[0].similarity >= matches[1].similarity);

        let err = booth.find_similar("missing", 2).await.unwrap_err();
        assert!(matches!(err, BoothError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn file_backed_store_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let conf: ConfDir = dir.path().to_str().unwrap().parse().unwrap();

        let receipt = {
            let booth = Booth::new(&conf, Metric::L2, seeded_opts()).await.unwrap();
            booth
                .ingest(&png_bytes(16, 16, [90, 90, 90]), &[], Some("keep".to_string()), None)
                .await
                .unwrap()
        };

        // 重新打开同一个数据目录，记录仍然在
        let booth = Booth::new(&conf, Metric::L2, seeded_opts()).await.unwrap();
        let artifact = booth.get_artifact(&receipt.id).await.unwrap();
        assert_eq!(artifact.session_id, "keep");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sessions_count_singles_and_strips() {
        let booth = Booth::in_memory(Metric::L2, seeded_opts()).await.unwrap();
        booth
            .ingest(&png_bytes(32, 32, [10, 200, 10]), &[], Some("s".to_string()), None)
            .await
            .unwrap();
        booth
            .ingest(&png_bytes(32, 32, [10, 10, 200]), &[], Some("s".to_string()), None)
            .await
            .unwrap();
        booth.compose_strip("s", StripStyle::default()).await.unwrap();

        let sessions = booth.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].image_count, 2);
        assert_eq!(sessions[0].strip_count, 1);
        assert!(sessions[0].latest_timestamp.is_some());
    }
}
