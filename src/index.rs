use std::path::Path;

use log::debug;

use crate::config::Metric;
use crate::db::{self, ArtifactMeta, ArtifactRecord, Database};
use crate::distance;
use crate::error::Result;

/// 索引里的一条完整记录
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub document: String,
    pub meta: ArtifactMeta,
    pub image: Vec<u8>,
}

/// 最近邻查询结果，相似度 = 1 - distance
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub entry: IndexEntry,
    pub distance: f32,
}

/// 以 SQLite 为后端的相似度索引。
///
/// 写入是单行 upsert，并发读写的原子性由连接池和 WAL 保证；
/// 查询与元数据过滤都是全表线性扫描，没有二级索引 ——
/// 这是文档化的小规模设计取舍，不是待修的缺陷。
pub struct SimilarityIndex {
    db: Database,
    metric: Metric,
}

impl SimilarityIndex {
    /// 打开（必要时创建）索引文件
    pub async fn open(path: &Path, metric: Metric) -> Result<Self> {
        let db = db::init_db(path).await?;
        Ok(Self { db, metric })
    }

    /// 内存索引，测试用
    pub async fn open_in_memory(metric: Metric) -> Result<Self> {
        let db = db::init_db_in_memory().await?;
        Ok(Self { db, metric })
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// 插入或按 ID 静默覆盖（last write wins）。ID 唯一性由调用方负责
    pub async fn add(
        &self,
        id: &str,
        vector: &[f32],
        document: &str,
        meta: &ArtifactMeta,
        image: &[u8],
    ) -> Result<()> {
        let record = ArtifactRecord {
            id: id.to_string(),
            vector: bytemuck::cast_slice(vector).to_vec(),
            document: document.to_string(),
            metadata: serde_json::to_string(meta)?,
            image: image.to_vec(),
        };
        db::crud::upsert_artifact(&self.db, &record).await?;
        debug!("indexed artifact {id}");
        Ok(())
    }

    /// 按 ID 读取
    pub async fn get(&self, id: &str) -> Result<Option<IndexEntry>> {
        match db::crud::get_artifact(&self.db, id).await? {
            Some(record) => Ok(Some(decode_entry(record)?)),
            None => Ok(None),
        }
    }

    /// 全量列出
    pub async fn get_all(&self) -> Result<Vec<IndexEntry>> {
        let records = db::crud::get_all_artifacts(&self.db).await?;
        records.into_iter().map(decode_entry).collect()
    }

    /// 只取所有元数据
    pub async fn get_all_meta(&self) -> Result<Vec<ArtifactMeta>> {
        let rows = db::crud::get_all_metadata(&self.db).await?;
        rows.iter().map(|raw| Ok(serde_json::from_str(raw)?)).collect()
    }

    /// 元数据谓词过滤，线性扫描
    pub async fn filter_by_meta<F>(&self, pred: F) -> Result<Vec<IndexEntry>>
    where
        F: Fn(&ArtifactMeta) -> bool,
    {
        let mut entries = self.get_all().await?;
        entries.retain(|entry| pred(&entry.meta));
        Ok(entries)
    }

    /// 查询与给定向量最近的 k 条记录，按距离升序。
    /// exclude 指定的 ID（通常是查询向量的来源记录）永远不会出现在结果里
    pub async fn query(
        &self,
        vector: &[f32],
        k: usize,
        exclude: Option<&str>,
    ) -> Result<Vec<Neighbor>> {
        let rows = db::crud::get_vectors(&self.db).await?;
        let mut ids = Vec::with_capacity(rows.len());
        let mut vectors = Vec::with_capacity(rows.len());
        for row in rows {
            if exclude == Some(row.id.as_str()) {
                continue;
            }
            vectors.push(decode_vector(&row.vector));
            ids.push(row.id);
        }

        let hits = distance::knn(self.metric, vector, &vectors, k);
        let mut neighbors = Vec::with_capacity(hits.len());
        for (idx, dist) in hits {
            if let Some(entry) = self.get(&ids[idx]).await? {
                neighbors.push(Neighbor { entry, distance: dist });
            }
        }
        Ok(neighbors)
    }
}

/// BLOB -> f32 向量；按值拷贝，不依赖 blob 的内存对齐
fn decode_vector(blob: &[u8]) -> Vec<f32> {
    bytemuck::pod_collect_to_vec(blob)
}

fn decode_entry(record: ArtifactRecord) -> Result<IndexEntry> {
    let meta: ArtifactMeta = serde_json::from_str(&record.metadata)?;
    Ok(IndexEntry {
        id: record.id,
        vector: decode_vector(&record.vector),
        document: record.document,
        meta,
        image: record.image,
    })
}
