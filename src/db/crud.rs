use sqlx::Result;

use super::Database;
use super::model::{ArtifactRecord, VectorRecord};

/// 插入或按 ID 覆盖一条 artifact 记录。
/// 覆盖是文档化的 last-write-wins 行为，不报错
pub async fn upsert_artifact(db: &Database, record: &ArtifactRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO artifact (id, vector, document, metadata, image)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            vector = excluded.vector,
            document = excluded.document,
            metadata = excluded.metadata,
            image = excluded.image
        "#,
    )
    .bind(&record.id)
    .bind(&record.vector)
    .bind(&record.document)
    .bind(&record.metadata)
    .bind(&record.image)
    .execute(db)
    .await?;

    Ok(())
}

/// 按 ID 查询完整记录
pub async fn get_artifact(db: &Database, id: &str) -> Result<Option<ArtifactRecord>> {
    sqlx::query_as(
        r#"
        SELECT id, vector, document, metadata, image FROM artifact WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

/// 全量读取，ID 升序保证遍历顺序稳定
pub async fn get_all_artifacts(db: &Database) -> Result<Vec<ArtifactRecord>> {
    sqlx::query_as(
        r#"
        SELECT id, vector, document, metadata, image FROM artifact ORDER BY id
        "#,
    )
    .fetch_all(db)
    .await
}

/// 只取 ID 和向量，线性扫描 k-NN 用
pub async fn get_vectors(db: &Database) -> Result<Vec<VectorRecord>> {
    sqlx::query_as(
        r#"
        SELECT id, vector FROM artifact ORDER BY id
        "#,
    )
    .fetch_all(db)
    .await
}

/// 只取元数据列，会话聚合用
pub async fn get_all_metadata(db: &Database) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT metadata FROM artifact ORDER BY id
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}
