use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use rand::rngs::StdRng;

use crate::error::{BoothError, Result};
use crate::filter::{FrameStyle, draw_frame};
use crate::text::{BlockFont, TextRender};

/// 拼条画布尺寸
pub const STRIP_WIDTH: u32 = 400;
pub const STRIP_HEIGHT: u32 = 1200;
/// 每条拼条的照片槽位数
pub const SLOT_COUNT: usize = 4;

/// 白色衬底方块边长
const BACKING_SIZE: u32 = 210;
/// 照片等比缩放的外接框边长（不裁剪）
const PHOTO_BOX: u32 = 190;
/// 四个槽位的纵向位置（衬底左上角 y）。
/// 槽距 264px，给拍立得的加宽底边和阴影线留出空隙
const SLOT_YS: [u32; 4] = [84, 348, 612, 876];
/// JPEG 编码质量
const JPEG_QUALITY: u8 = 90;

const BACKGROUND: Rgb<u8> = Rgb([253, 240, 245]);
const BACKING: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([40, 35, 45]);
const ACCENT: Rgb<u8> = Rgb([173, 122, 142]);

const HEADER_TEXT: &str = "PHOTOBOOTH";
const SUBTITLE_TEXT: &str = "SAY CHEESE!";
const TAGLINE_TEXT: &str = "KEEP THE MOMENT";
/// 角落装饰字形
const CORNER_GLYPH: &str = "*";

/// 固定版式的拼条排版引擎。
/// 文本渲染通过 [`TextRender`] 注入，排版逻辑不关心具体字体资源。
pub struct StripCompositor<'a> {
    text: &'a dyn TextRender,
}

impl Default for StripCompositor<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> StripCompositor<'a> {
    pub fn new() -> Self {
        Self { text: &BlockFont }
    }

    /// 注入自定义文本渲染实现
    pub fn with_text(text: &'a dyn TextRender) -> Self {
        Self { text }
    }

    /// 把 1~4 张照片合成为固定版式拼条。
    /// 不足 4 张时用最后一张补齐剩余槽位；空列表是验证错误。
    pub fn compose(
        &self,
        photos: &[RgbImage],
        frame: FrameStyle,
        date_text: &str,
        rng: &mut StdRng,
    ) -> Result<RgbImage> {
        if photos.is_empty() {
            return Err(BoothError::EmptyStrip);
        }

        let mut canvas = RgbImage::from_pixel(STRIP_WIDTH, STRIP_HEIGHT, BACKGROUND);

        // 整条外框
        draw_hollow_rect_mut(
            &mut canvas,
            Rect::at(2, 2).of_size(STRIP_WIDTH - 4, STRIP_HEIGHT - 4),
            INK,
        );

        // 页眉与副标题，按测量宽度水平居中
        self.draw_centered(&mut canvas, HEADER_TEXT, 18, 3, INK);
        self.draw_centered(&mut canvas, SUBTITLE_TEXT, 46, 2, ACCENT);

        // 槽位：白色衬底 + 等比缩放的照片 + 相框
        let last = photos.last().unwrap();
        for (i, &slot_y) in SLOT_YS.iter().enumerate() {
            let photo = photos.get(i).unwrap_or(last);
            self.place_photo(&mut canvas, photo, slot_y, frame, rng);
        }

        // 页脚：日期戳与标语
        self.draw_centered(&mut canvas, date_text, 1146, 2, INK);
        self.draw_centered(&mut canvas, TAGLINE_TEXT, 1174, 1, ACCENT);

        // 两个角落装饰，固定偏移
        self.text.draw(&mut canvas, CORNER_GLYPH, 12, 12, 2, ACCENT);
        let corner_w = self.text.measure(CORNER_GLYPH, 2) as i32;
        self.text.draw(
            &mut canvas,
            CORNER_GLYPH,
            STRIP_WIDTH as i32 - 12 - corner_w,
            STRIP_HEIGHT as i32 - 12 - (crate::text::GLYPH_H * 2) as i32,
            2,
            ACCENT,
        );

        Ok(canvas)
    }

    fn draw_centered(&self, canvas: &mut RgbImage, text: &str, y: i32, scale: u32, color: Rgb<u8>) {
        let w = self.text.measure(text, scale);
        let x = (STRIP_WIDTH.saturating_sub(w) / 2) as i32;
        self.text.draw(canvas, text, x, y, scale, color);
    }

    fn place_photo(
        &self,
        canvas: &mut RgbImage,
        photo: &RgbImage,
        slot_y: u32,
        frame: FrameStyle,
        rng: &mut StdRng,
    ) {
        let slot_x = (STRIP_WIDTH - BACKING_SIZE) / 2;
        let slot = Rect::at(slot_x as i32, slot_y as i32).of_size(BACKING_SIZE, BACKING_SIZE);
        draw_filled_rect_mut(canvas, slot, BACKING);

        // 等比缩放进外接框，保持纵横比，不裁剪
        let (w, h) = photo.dimensions();
        let scale = (PHOTO_BOX as f32 / w as f32).min(PHOTO_BOX as f32 / h as f32);
        let nw = ((w as f32 * scale).round() as u32).max(1);
        let nh = ((h as f32 * scale).round() as u32).max(1);
        let resized = imageops::resize(photo, nw, nh, FilterType::Triangle);

        // 在衬底上居中
        let px = slot_x + (BACKING_SIZE - nw) / 2;
        let py = slot_y + (BACKING_SIZE - nh) / 2;
        imageops::replace(canvas, &resized, px as i64, py as i64);

        draw_frame(canvas, slot, frame, rng);
    }
}

/// 按固定质量把拼条编码为 JPEG
pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder.write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn slot_region(canvas: &RgbImage, slot: usize) -> RgbImage {
        let slot_x = (STRIP_WIDTH - BACKING_SIZE) / 2;
        imageops::crop_imm(canvas, slot_x, SLOT_YS[slot], BACKING_SIZE, BACKING_SIZE).to_image()
    }

    #[test]
    fn empty_photo_list_is_rejected() {
        let compositor = StripCompositor::new();
        let result =
            compositor.compose(&[], FrameStyle::Classic, "2026-08-07 12:00", &mut seeded());
        assert!(matches!(result, Err(BoothError::EmptyStrip)));
    }

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(1)
    }

    #[test]
    fn single_photo_fills_all_four_slots() {
        let photo = RgbImage::from_pixel(64, 48, image::Rgb([200, 30, 30]));
        let compositor = StripCompositor::new();
        let strip = compositor
            .compose(&[photo], FrameStyle::Classic, "2026-08-07 12:00", &mut seeded())
            .unwrap();

        assert_eq!(strip.dimensions(), (STRIP_WIDTH, STRIP_HEIGHT));
        let first = slot_region(&strip, 0);
        for slot in 1..SLOT_COUNT {
            assert_eq!(slot_region(&strip, slot).as_raw(), first.as_raw());
        }
    }

    #[test]
    fn missing_slots_duplicate_last_photo() {
        let p1 = RgbImage::from_pixel(64, 48, image::Rgb([200, 30, 30]));
        let p2 = RgbImage::from_pixel(64, 48, image::Rgb([30, 30, 200]));
        let compositor = StripCompositor::new();
        let strip = compositor
            .compose(&[p1, p2], FrameStyle::Polaroid, "2026-08-07 12:00", &mut seeded())
            .unwrap();

        let second = slot_region(&strip, 1);
        // 第 3、4 槽位与第 2 槽位逐像素一致，且与第 1 槽位不同
        assert_eq!(slot_region(&strip, 2).as_raw(), second.as_raw());
        assert_eq!(slot_region(&strip, 3).as_raw(), second.as_raw());
        assert_ne!(slot_region(&strip, 0).as_raw(), second.as_raw());
    }

    #[test]
    fn aspect_ratio_is_preserved() {
        // 宽图：缩放后贴图区域左右顶满外接框，上下留出衬底白边
        let photo = RgbImage::from_pixel(200, 50, image::Rgb([0, 255, 0]));
        let compositor = StripCompositor::new();
        let strip = compositor
            .compose(&[photo], FrameStyle::Classic, "2026-08-07 12:00", &mut seeded())
            .unwrap();

        let slot = slot_region(&strip, 0);
        let center = BACKING_SIZE / 2;
        // 衬底中心是照片
        assert_eq!(slot.get_pixel(center, center), &image::Rgb([0, 255, 0]));
        // 衬底顶部边缘仍是白色（照片没有被拉伸满）
        assert_eq!(slot.get_pixel(center, 8), &image::Rgb([255, 255, 255]));
    }

    #[test]
    fn jpeg_roundtrip_keeps_dimensions() {
        let photo = RgbImage::from_pixel(32, 32, image::Rgb([120, 80, 40]));
        let compositor = StripCompositor::new();
        let strip = compositor
            .compose(&[photo], FrameStyle::Distressed, "2026-08-07 12:00", &mut seeded())
            .unwrap();
        let bytes = encode_jpeg(&strip).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (STRIP_WIDTH, STRIP_HEIGHT));
    }
}
