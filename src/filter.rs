use clap::ValueEnum;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use image::imageops;
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
};
use imageproc::rect::Rect;
use rand::Rng;
use rand::rngs::StdRng;

use crate::config::FilterOptions;

/// 像素滤镜种类。
/// 滤镜都是纯函数，组合严格按给定顺序执行且不可交换：
/// 先 blur 再 vintage 与反过来的数值结果不同。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Vintage,
    BlackWhite,
    Blur,
    Enhance,
    Retro,
    Grain,
    Glitter,
    Bokeh,
}

impl FilterKind {
    /// 解析滤镜名，接受若干别名；未知名字返回 None，由调用方静默跳过
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "vintage" | "sepia" => Some(Self::Vintage),
            "bw" | "black_white" | "grayscale" => Some(Self::BlackWhite),
            "blur" => Some(Self::Blur),
            "enhance" => Some(Self::Enhance),
            "retro" => Some(Self::Retro),
            "grain" => Some(Self::Grain),
            "glitter" => Some(Self::Glitter),
            "bokeh" => Some(Self::Bokeh),
            _ => None,
        }
    }

    /// 写入元数据的规范名
    pub fn name(self) -> &'static str {
        match self {
            Self::Vintage => "vintage",
            Self::BlackWhite => "black_white",
            Self::Blur => "blur",
            Self::Enhance => "enhance",
            Self::Retro => "retro",
            Self::Grain => "grain",
            Self::Glitter => "glitter",
            Self::Bokeh => "bokeh",
        }
    }

    fn apply(self, image: RgbImage, opts: &FilterOptions, rng: &mut StdRng) -> RgbImage {
        match self {
            Self::Vintage => vintage(image),
            Self::BlackWhite => black_white(image),
            Self::Blur => imageops::blur(&image, opts.blur_sigma),
            Self::Enhance => enhance(image),
            Self::Retro => retro(image),
            Self::Grain => grain(image, opts.grain_amount, rng),
            Self::Glitter => glitter(image, rng),
            Self::Bokeh => bokeh(image),
        }
    }
}

/// 按给定顺序依次应用滤镜。
/// 返回处理后的图片和实际生效的规范名列表（只含识别出的名字，保持请求顺序）。
pub fn apply_filters(
    image: RgbImage,
    names: &[String],
    opts: &FilterOptions,
    rng: &mut StdRng,
) -> (RgbImage, Vec<String>) {
    let mut image = image;
    let mut applied = Vec::new();
    for name in names {
        let Some(kind) = FilterKind::parse(name) else {
            continue;
        };
        image = kind.apply(image, opts, rng);
        applied.push(kind.name().to_string());
    }
    (image, applied)
}

#[inline]
fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[inline]
fn luma(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

/// 泛黄复古：固定 3x3 矩阵作用于每个像素的 RGB，逐通道截断到 [0,255]
fn vintage(mut image: RgbImage) -> RgbImage {
    for px in image.pixels_mut() {
        let [r, g, b] = px.0.map(|v| v as f32);
        px.0 = [
            clamp_u8(0.393 * r + 0.769 * g + 0.189 * b),
            clamp_u8(0.349 * r + 0.686 * g + 0.168 * b),
            clamp_u8(0.272 * r + 0.534 * g + 0.131 * b),
        ];
    }
    image
}

/// 黑白：BT.601 亮度，再扩回 R=G=B 三通道
fn black_white(mut image: RgbImage) -> RgbImage {
    for px in image.pixels_mut() {
        let [r, g, b] = px.0.map(|v| v as f32);
        let l = clamp_u8(luma(r, g, b));
        px.0 = [l, l, l];
    }
    image
}

/// 全图亮度均值，对比度调整的基准点
fn mean_luma(image: &RgbImage) -> f32 {
    let mut sum = 0.0f64;
    for px in image.pixels() {
        let [r, g, b] = px.0.map(|v| v as f32);
        sum += luma(r, g, b) as f64;
    }
    (sum / (image.width() as f64 * image.height() as f64)) as f32
}

/// 饱和度调整：每个像素向自身亮度做线性插值，factor > 1 时为外推增强
fn adjust_saturation(image: &mut RgbImage, factor: f32) {
    for px in image.pixels_mut() {
        let [r, g, b] = px.0.map(|v| v as f32);
        let l = luma(r, g, b);
        px.0 = [
            clamp_u8(l + factor * (r - l)),
            clamp_u8(l + factor * (g - l)),
            clamp_u8(l + factor * (b - l)),
        ];
    }
}

/// 对比度调整：围绕全图亮度均值插值
fn adjust_contrast(image: &mut RgbImage, factor: f32) {
    let mean = mean_luma(image);
    for px in image.pixels_mut() {
        for c in &mut px.0 {
            *c = clamp_u8(mean + factor * (*c as f32 - mean));
        }
    }
}

/// 色彩增强：饱和度 x1.2 后对比度 x1.1，每一步先截断再进入下一步
fn enhance(mut image: RgbImage) -> RgbImage {
    adjust_saturation(&mut image, 1.2);
    adjust_contrast(&mut image, 1.1);
    image
}

/// 怀旧：降饱和（x0.8）后红移，R x1.1、B x0.9，逐通道独立截断
fn retro(mut image: RgbImage) -> RgbImage {
    adjust_saturation(&mut image, 0.8);
    for px in image.pixels_mut() {
        px.0[0] = clamp_u8(px.0[0] as f32 * 1.1);
        px.0[2] = clamp_u8(px.0[2] as f32 * 0.9);
    }
    image
}

/// 胶片颗粒：每个像素每个通道叠加 [-amount, amount] 内独立采样的均匀整数
fn grain(mut image: RgbImage, amount: i32, rng: &mut StdRng) -> RgbImage {
    for px in image.pixels_mut() {
        for c in &mut px.0 {
            let v = *c as i32 + rng.random_range(-amount..=amount);
            *c = v.clamp(0, 255) as u8;
        }
    }
    image
}

/// 闪粉颜色：粉、金、白
const GLITTER_COLORS: [[u8; 3]; 3] = [[255, 105, 180], [255, 215, 0], [255, 255, 255]];
/// 闪粉圆点数量
const GLITTER_COUNT: u32 = 200;

/// 闪粉：透明叠加层上随机画半透明小圆（半径 1~3px、alpha 50~150），
/// 再整层 alpha 合成回底图
fn glitter(image: RgbImage, rng: &mut StdRng) -> RgbImage {
    let (w, h) = image.dimensions();
    let mut base = DynamicImage::ImageRgb8(image).into_rgba8();
    let mut overlay = RgbaImage::new(w, h);
    for _ in 0..GLITTER_COUNT {
        let x = rng.random_range(0..w as i32);
        let y = rng.random_range(0..h as i32);
        let radius = rng.random_range(1..=3);
        let alpha: u8 = rng.random_range(50..=150);
        let [r, g, b] = GLITTER_COLORS[rng.random_range(0..GLITTER_COLORS.len())];
        draw_filled_circle_mut(&mut overlay, (x, y), radius, Rgba([r, g, b, alpha]));
    }
    imageops::overlay(&mut base, &overlay, 0, 0);
    DynamicImage::ImageRgba8(base).into_rgb8()
}

/// 背景虚化用的强模糊 sigma
const BOKEH_SIGMA: f32 = 8.0;

/// 背景虚化。约定方向：画面中心保持清晰，边缘虚化。
/// 径向掩码 w = min(1, (d/maxR)²)，d 为像素到画布中心的距离，
/// maxR 为中心到角的距离；w 是混合进强模糊副本的权重，
/// 输出 = 原图·(1-w) + 模糊副本·w。反转这个方向会让边缘清晰、中心模糊。
fn bokeh(image: RgbImage) -> RgbImage {
    let (w, h) = image.dimensions();
    let blurred = imageops::blur(&image, BOKEH_SIGMA);
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let max_r2 = cx * cx + cy * cy;
    let mut out = image;
    for (x, y, px) in out.enumerate_pixels_mut() {
        let (dx, dy) = (x as f32 - cx, y as f32 - cy);
        let wgt = ((dx * dx + dy * dy) / max_r2).min(1.0);
        let bl = blurred.get_pixel(x, y);
        for c in 0..3 {
            px.0[c] = clamp_u8(px.0[c] as f32 * (1.0 - wgt) + bl.0[c] as f32 * wgt);
        }
    }
    out
}

/// 拼条里每张照片的相框样式
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrameStyle {
    /// 细黑边
    #[default]
    Classic,
    /// 宽白边拍立得，底边加宽
    Polaroid,
    /// 做旧边框，带随机划痕
    Distressed,
}

/// 相框绘制。作用于拼条画布上的照片槽位（含白色衬底的整块区域），
/// 而不是原始照片本身。
pub fn draw_frame(canvas: &mut RgbImage, slot: Rect, style: FrameStyle, rng: &mut StdRng) {
    match style {
        FrameStyle::Classic => frame_classic(canvas, slot),
        FrameStyle::Polaroid => frame_polaroid(canvas, slot),
        FrameStyle::Distressed => frame_distressed(canvas, slot, rng),
    }
}

/// 细黑边：沿槽位外缘画两圈空心矩形
fn frame_classic(canvas: &mut RgbImage, slot: Rect) {
    let ink = Rgb([30, 30, 30]);
    for inset in 0..2i32 {
        let rect = Rect::at(slot.left() - inset, slot.top() - inset)
            .of_size(slot.width() + 2 * inset as u32, slot.height() + 2 * inset as u32);
        draw_hollow_rect_mut(canvas, rect, ink);
    }
}

const POLAROID_BORDER: u32 = 12;
const POLAROID_BOTTOM: u32 = 36;

/// 拍立得：四周厚白边，底边加宽，右、下两侧各一条浅灰阴影线
fn frame_polaroid(canvas: &mut RgbImage, slot: Rect) {
    let white = Rgb([255, 255, 255]);
    let shadow = Rgb([205, 198, 202]);
    let b = POLAROID_BORDER as i32;
    let outer_w = slot.width() + 2 * POLAROID_BORDER;

    // 上、左、右三条等宽白边，底边加宽
    draw_filled_rect_mut(
        canvas,
        Rect::at(slot.left() - b, slot.top() - b).of_size(outer_w, POLAROID_BORDER),
        white,
    );
    draw_filled_rect_mut(
        canvas,
        Rect::at(slot.left() - b, slot.top()).of_size(POLAROID_BORDER, slot.height()),
        white,
    );
    draw_filled_rect_mut(
        canvas,
        Rect::at(slot.left() + slot.width() as i32, slot.top())
            .of_size(POLAROID_BORDER, slot.height()),
        white,
    );
    draw_filled_rect_mut(
        canvas,
        Rect::at(slot.left() - b, slot.top() + slot.height() as i32)
            .of_size(outer_w, POLAROID_BOTTOM),
        white,
    );

    // 右、下两条阴影线
    let right = (slot.left() + slot.width() as i32 + b) as f32;
    let bottom = (slot.top() + slot.height() as i32 + POLAROID_BOTTOM as i32) as f32;
    let left = (slot.left() - b) as f32;
    let top = (slot.top() - b) as f32;
    draw_line_segment_mut(canvas, (right + 1.0, top), (right + 1.0, bottom), shadow);
    draw_line_segment_mut(canvas, (left, bottom + 1.0), (right + 1.0, bottom + 1.0), shadow);
}

const DISTRESSED_BORDER: u32 = 10;
/// 划痕条数固定，位置由注入的随机源决定
const DISTRESSED_SCRATCHES: u32 = 6;

/// 做旧：棕色厚边框，边框带内随机画若干条浅色短划痕
fn frame_distressed(canvas: &mut RgbImage, slot: Rect, rng: &mut StdRng) {
    let brown = Rgb([101, 67, 33]);
    let scratch = Rgb([222, 203, 164]);
    let b = DISTRESSED_BORDER as i32;
    let outer_w = slot.width() + 2 * DISTRESSED_BORDER;

    let bands = [
        Rect::at(slot.left() - b, slot.top() - b).of_size(outer_w, DISTRESSED_BORDER),
        Rect::at(slot.left() - b, slot.top() + slot.height() as i32)
            .of_size(outer_w, DISTRESSED_BORDER),
        Rect::at(slot.left() - b, slot.top()).of_size(DISTRESSED_BORDER, slot.height()),
        Rect::at(slot.left() + slot.width() as i32, slot.top())
            .of_size(DISTRESSED_BORDER, slot.height()),
    ];
    for band in bands {
        draw_filled_rect_mut(canvas, band, brown);
    }

    for _ in 0..DISTRESSED_SCRATCHES {
        let band = bands[rng.random_range(0..bands.len())];
        let x0 = band.left() + rng.random_range(0..band.width() as i32);
        let y0 = band.top() + rng.random_range(0..band.height() as i32);
        let x1 = x0 + rng.random_range(-7..=7);
        let y1 = y0 + rng.random_range(-3..=3);
        draw_line_segment_mut(canvas, (x0 as f32, y0 as f32), (x1 as f32, y1 as f32), scratch);
    }
}
