use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::{ArtifactKind, ArtifactMeta};

/// 单个会话的汇总统计。
/// 会话不是存储实体，统计完全由扫描元数据在读取时导出
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub image_count: u32,
    pub strip_count: u32,
    /// 字典序最大的时间戳；依赖时间戳的固定宽度可排序格式
    pub latest_timestamp: Option<String>,
}

/// 把元数据按会话聚合。type 标签缺省时按单张照片计数
pub fn group_by_session<'a, I>(metas: I) -> Vec<SessionSummary>
where
    I: IntoIterator<Item = &'a ArtifactMeta>,
{
    let mut sessions: BTreeMap<String, SessionSummary> = BTreeMap::new();
    for meta in metas {
        let entry = sessions.entry(meta.session_id.clone()).or_insert_with(|| SessionSummary {
            session_id: meta.session_id.clone(),
            image_count: 0,
            strip_count: 0,
            latest_timestamp: None,
        });
        match meta.kind {
            ArtifactKind::Single => entry.image_count += 1,
            ArtifactKind::Strip => entry.strip_count += 1,
        }
        if entry.latest_timestamp.as_deref() < Some(meta.timestamp.as_str()) {
            entry.latest_timestamp = Some(meta.timestamp.clone());
        }
    }
    sessions.into_values().collect()
}
