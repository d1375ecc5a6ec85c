use image::RgbImage;
use image::imageops::{self, FilterType};

/// 特征向量维数
pub const FEATURE_DIM: usize = 512;
/// 提取前统一缩放到的边长
const FEATURE_EDGE: u32 = 224;
/// 224 * 224 * 3 / 512
const STRIDE: usize = (FEATURE_EDGE as usize * FEATURE_EDGE as usize * 3) / FEATURE_DIM;

/// 提取确定性特征向量：缩放到 224x224、逐像素展平 RGB 字节、
/// 归一化到 [0,1]，再按固定步长下采样并截断到恰好 512 维。
///
/// 这是哈希式特征而非学习型 embedding：同一张图永远得到同一个向量，
/// 视觉相近的图向量距离通常较小，但除了入口的缩放之外对旋转、裁剪均无不变性。
pub fn extract(image: &RgbImage) -> Vec<f32> {
    let resized = imageops::resize(image, FEATURE_EDGE, FEATURE_EDGE, FilterType::Triangle);
    let raw = resized.into_raw();
    raw.iter().step_by(STRIDE).take(FEATURE_DIM).map(|&v| v as f32 / 255.0).collect()
}
