//! Paints highlight rectangles onto rendered pages and encodes the result.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use pagewise_core::{HighlightRect, RenderImage};
use png::{BitDepth, ColorType, Encoder};

pub const HIGHLIGHT_COLOR: [u8; 3] = [255, 235, 59];
pub const HIGHLIGHT_ALPHA: f32 = 0.4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PixelRect {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

/// Blends every rectangle onto `image`. Rectangles are in the image's pixel
/// space; the parts falling outside the image are dropped.
pub fn paint_highlights(image: &mut RenderImage, rects: &[HighlightRect]) {
    if image.width == 0 || image.height == 0 {
        return;
    }
    for rect in rects {
        if let Some(pixels) = to_pixel_rect(rect, image.width, image.height) {
            fill_rect(image, pixels, HIGHLIGHT_COLOR, HIGHLIGHT_ALPHA);
        }
    }
}

pub fn encode_png(image: &RenderImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut encoder = Encoder::new(&mut buffer, image.width, image.height);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .context("failed to write png header")?;
        writer
            .write_image_data(&image.pixels)
            .context("failed to encode png data")?;
    }
    Ok(buffer)
}

pub fn write_png(image: &RenderImage, path: &Path) -> Result<()> {
    let encoded = encode_png(image)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {:?}", parent))?;
    }
    fs::write(path, encoded).with_context(|| format!("failed to write {:?}", path))
}

fn to_pixel_rect(rect: &HighlightRect, width: u32, height: u32) -> Option<PixelRect> {
    if !(rect.x.is_finite() && rect.y.is_finite() && rect.width.is_finite() && rect.height.is_finite()) {
        return None;
    }
    let max_x = width as f32;
    let max_y = height as f32;
    let x0 = rect.x.floor().clamp(0.0, max_x) as u32;
    let x1 = (rect.x + rect.width).ceil().clamp(0.0, max_x) as u32;
    let y0 = rect.y.floor().clamp(0.0, max_y) as u32;
    let y1 = (rect.y + rect.height).ceil().clamp(0.0, max_y) as u32;

    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(PixelRect { x0, y0, x1, y1 })
}

fn fill_rect(image: &mut RenderImage, rect: PixelRect, color: [u8; 3], alpha: f32) {
    let width = image.width as usize;
    for y in rect.y0..rect.y1 {
        let row_start = y as usize * width * 4;
        for x in rect.x0..rect.x1 {
            let idx = row_start + x as usize * 4;
            if let Some(pixel) = image.pixels.get_mut(idx..idx + 4) {
                blend_pixel(pixel, color, alpha);
            }
        }
    }
}

fn blend_pixel(pixel: &mut [u8], color: [u8; 3], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    let inv = 1.0 - alpha;
    for (channel, target) in pixel.iter_mut().zip(color) {
        *channel = (*channel as f32 * inv + target as f32 * alpha)
            .round()
            .clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white(width: u32, height: u32) -> RenderImage {
        RenderImage {
            width,
            height,
            pixels: vec![255; (width * height * 4) as usize],
        }
    }

    fn pixel(image: &RenderImage, x: u32, y: u32) -> &[u8] {
        let idx = ((y * image.width + x) * 4) as usize;
        &image.pixels[idx..idx + 4]
    }

    #[test]
    fn painting_tints_only_the_covered_pixels() {
        let mut image = white(10, 10);
        let rect = HighlightRect {
            x: 2.0,
            y: 3.0,
            width: 2.0,
            height: 1.0,
        };

        paint_highlights(&mut image, &[rect]);

        // 255 * 0.6 + 235 * 0.4 = 247, 255 * 0.6 + 59 * 0.4 = 176.6
        assert_eq!(pixel(&image, 2, 3), &[255, 247, 177, 255]);
        assert_eq!(pixel(&image, 3, 3), &[255, 247, 177, 255]);
        assert_eq!(pixel(&image, 4, 3), &[255, 255, 255, 255]);
        assert_eq!(pixel(&image, 2, 4), &[255, 255, 255, 255]);
    }

    #[test]
    fn rectangles_are_clipped_to_the_image() {
        let mut image = white(4, 4);
        let rect = HighlightRect {
            x: -5.0,
            y: 2.5,
            width: 100.0,
            height: 100.0,
        };

        paint_highlights(&mut image, &[rect]);

        assert_eq!(pixel(&image, 0, 2)[2], 177);
        assert_eq!(pixel(&image, 3, 3)[2], 177);
        assert_eq!(pixel(&image, 0, 1)[2], 255);
    }

    #[test]
    fn degenerate_rectangles_are_ignored() {
        let mut image = white(4, 4);
        let rects = [
            HighlightRect {
                x: 1.0,
                y: 1.0,
                width: 0.0,
                height: 2.0,
            },
            HighlightRect {
                x: f32::NAN,
                y: 1.0,
                width: 2.0,
                height: 2.0,
            },
            HighlightRect {
                x: 10.0,
                y: 10.0,
                width: 2.0,
                height: 2.0,
            },
        ];

        paint_highlights(&mut image, &rects);

        assert!(image.pixels.iter().all(|&value| value == 255));
    }

    #[test]
    fn encoded_png_has_signature_and_dimensions() {
        let image = white(3, 2);
        let encoded = encode_png(&image).unwrap();

        assert_eq!(&encoded[..8], b"\x89PNG\r\n\x1a\n");
        // IHDR width and height follow the 8-byte chunk header.
        assert_eq!(&encoded[16..20], &3u32.to_be_bytes());
        assert_eq!(&encoded[20..24], &2u32.to_be_bytes());
    }

    #[test]
    fn mismatched_pixel_buffer_fails_to_encode() {
        let image = RenderImage {
            width: 3,
            height: 3,
            pixels: vec![0; 4],
        };
        assert!(encode_png(&image).is_err());
    }
}
