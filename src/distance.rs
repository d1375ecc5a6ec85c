use crate::config::Metric;

/// 两个等长向量的欧氏距离
#[inline]
pub fn l2(va: &[f32], vb: &[f32]) -> f32 {
    va.iter().zip(vb).map(|(a, b)| (a - b) * (a - b)).sum::<f32>().sqrt()
}

/// 余弦距离，即 1 - 余弦相似度；零向量参与时约定距离为 1
#[inline]
pub fn cosine(va: &[f32], vb: &[f32]) -> f32 {
    let mut dot = 0.0;
    let mut na = 0.0;
    let mut nb = 0.0;
    for (a, b) in va.iter().zip(vb) {
        dot += a * b;
        na += a * a;
        nb += b * b;
    }
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    1.0 - dot / (na.sqrt() * nb.sqrt())
}

#[inline]
pub fn distance(metric: Metric, va: &[f32], vb: &[f32]) -> f32 {
    match metric {
        Metric::L2 => l2(va, vb),
        Metric::Cosine => cosine(va, vb),
    }
}

/// 对候选向量做线性扫描，返回距离最小的 k 个 (下标, 距离)，按距离升序。
/// 没有任何索引结构，复杂度 O(n·d)，只适合小规模数据
pub fn knn(metric: Metric, query: &[f32], candidates: &[Vec<f32>], k: usize) -> Vec<(usize, f32)> {
    let mut hits: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(i, v)| (i, distance(metric, query, v)))
        .collect();
    hits.sort_unstable_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
    hits.truncate(k);
    hits
}
