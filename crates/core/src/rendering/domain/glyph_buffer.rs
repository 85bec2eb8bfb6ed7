use image::{Rgba, RgbaImage};

use super::style::Rgb;

/// 8-bit coverage of a rasterized glyph run, cropped to its ink box.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl CoverageMask {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "mask length must equal width * height"
        );
        Self {
            width,
            height,
            data,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, 0)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[(y * self.width + x) as usize]
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Inclusive-exclusive pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InkBounds {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl InkBounds {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    fn union(self, other: InkBounds) -> InkBounds {
        InkBounds {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Frame-sized straight-alpha RGBA canvas holding only caption pixels.
///
/// Tracks the rectangle that has received ink so compositing can skip the
/// untouched, fully transparent remainder.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphBuffer {
    image: RgbaImage,
    ink: Option<InkBounds>,
}

impl GlyphBuffer {
    /// A fully transparent buffer.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            ink: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn ink_bounds(&self) -> Option<InkBounds> {
        self.ink
    }

    pub fn is_transparent(&self) -> bool {
        self.ink.is_none()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Paints `mask` with its top-left at `(x, y)` in an opaque `color`,
    /// blending over whatever is already in the buffer. Parts that fall
    /// outside the canvas are clipped.
    pub fn paint(&mut self, mask: &CoverageMask, x: i32, y: i32, color: Rgb) {
        let Some(clip) = self.clip(mask, x, y) else {
            return;
        };

        let src = color.channels();
        let mut touched = false;
        for py in clip.y0..clip.y1 {
            let my = (py as i64 - y as i64) as u32;
            for px in clip.x0..clip.x1 {
                let mx = (px as i64 - x as i64) as u32;
                let coverage = mask.get(mx, my);
                if coverage == 0 {
                    continue;
                }
                let dst = self.image.get_pixel_mut(px, py);
                *dst = Rgba(blend_over(src, coverage, dst.0));
                touched = true;
            }
        }

        if touched {
            self.ink = Some(match self.ink {
                Some(existing) => existing.union(clip),
                None => clip,
            });
        }
    }

    fn clip(&self, mask: &CoverageMask, x: i32, y: i32) -> Option<InkBounds> {
        if mask.is_empty() {
            return None;
        }
        let x0 = (x as i64).max(0);
        let y0 = (y as i64).max(0);
        let x1 = (x as i64 + mask.width() as i64).min(self.width() as i64);
        let y1 = (y as i64 + mask.height() as i64).min(self.height() as i64);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some(InkBounds {
            x0: x0 as u32,
            y0: y0 as u32,
            x1: x1 as u32,
            y1: y1 as u32,
        })
    }
}

/// Straight-alpha "over" of an opaque colour at `coverage` onto `dst`.
fn blend_over(src: [u8; 3], coverage: u8, dst: [u8; 4]) -> [u8; 4] {
    let sa = coverage as u32;
    if sa == 255 {
        return [src[0], src[1], src[2], 255];
    }
    let da = dst[3] as u32;
    let dst_weight = da * (255 - sa);
    let out_a_scaled = sa * 255 + dst_weight;
    if out_a_scaled == 0 {
        return dst;
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let num = src[c] as u32 * sa * 255 + dst[c] as u32 * dst_weight;
        out[c] = ((num + out_a_scaled / 2) / out_a_scaled) as u8;
    }
    out[3] = ((out_a_scaled + 127) / 255) as u8;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_mask(w: u32, h: u32, value: u8) -> CoverageMask {
        CoverageMask::new(vec![value; (w * h) as usize], w, h)
    }

    #[test]
    fn test_transparent_buffer_has_no_ink() {
        let buf = GlyphBuffer::transparent(8, 4);
        assert_eq!(buf.width(), 8);
        assert_eq!(buf.height(), 4);
        assert!(buf.is_transparent());
        assert!(buf.as_image().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn test_full_coverage_writes_opaque_color() {
        let mut buf = GlyphBuffer::transparent(10, 10);
        buf.paint(&solid_mask(2, 3, 255), 4, 5, Rgb(10, 20, 30));

        assert_eq!(buf.pixel(4, 5), [10, 20, 30, 255]);
        assert_eq!(buf.pixel(5, 7), [10, 20, 30, 255]);
        assert_eq!(buf.pixel(6, 5), [0, 0, 0, 0]);
        assert_eq!(
            buf.ink_bounds(),
            Some(InkBounds {
                x0: 4,
                y0: 5,
                x1: 6,
                y1: 8
            })
        );
    }

    #[test]
    fn test_partial_coverage_keeps_straight_color() {
        let mut buf = GlyphBuffer::transparent(1, 1);
        buf.paint(&solid_mask(1, 1, 128), 0, 0, Rgb(200, 100, 0));
        let [r, g, b, a] = buf.pixel(0, 0);
        assert_eq!([r, g, b], [200, 100, 0]);
        assert_eq!(a, 128);
    }

    #[test]
    fn test_repeated_same_color_passes_raise_alpha_only() {
        let mut buf = GlyphBuffer::transparent(1, 1);
        for _ in 0..4 {
            buf.paint(&solid_mask(1, 1, 100), 0, 0, Rgb(0, 0, 0));
        }
        let [r, g, b, a] = buf.pixel(0, 0);
        assert_eq!([r, g, b], [0, 0, 0]);
        assert!(a > 100);
    }

    #[test]
    fn test_later_full_coverage_wins() {
        let mut buf = GlyphBuffer::transparent(1, 1);
        buf.paint(&solid_mask(1, 1, 255), 0, 0, Rgb(0, 0, 0));
        buf.paint(&solid_mask(1, 1, 255), 0, 0, Rgb(255, 255, 0));
        assert_eq!(buf.pixel(0, 0), [255, 255, 0, 255]);
    }

    #[test]
    fn test_partial_fill_over_opaque_outline_mixes() {
        let mut buf = GlyphBuffer::transparent(1, 1);
        buf.paint(&solid_mask(1, 1, 255), 0, 0, Rgb(0, 0, 0));
        buf.paint(&solid_mask(1, 1, 51), 0, 0, Rgb(255, 255, 255));
        assert_eq!(buf.pixel(0, 0), [51, 51, 51, 255]);
    }

    #[test]
    fn test_zero_coverage_leaves_pixel_and_bounds() {
        let mut buf = GlyphBuffer::transparent(4, 4);
        buf.paint(&solid_mask(2, 2, 0), 1, 1, Rgb(255, 0, 0));
        assert!(buf.is_transparent());
        assert_eq!(buf.pixel(1, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn test_paint_clips_at_edges() {
        let mut buf = GlyphBuffer::transparent(4, 4);
        buf.paint(&solid_mask(3, 3, 255), -2, 2, Rgb(1, 2, 3));
        assert_eq!(buf.pixel(0, 2), [1, 2, 3, 255]);
        assert_eq!(buf.pixel(0, 3), [1, 2, 3, 255]);
        assert_eq!(buf.pixel(1, 2), [0, 0, 0, 0]);
        assert_eq!(
            buf.ink_bounds(),
            Some(InkBounds {
                x0: 0,
                y0: 2,
                x1: 1,
                y1: 4
            })
        );
    }

    #[test]
    fn test_paint_fully_offscreen_is_noop() {
        let mut buf = GlyphBuffer::transparent(4, 4);
        buf.paint(&solid_mask(2, 2, 255), 10, 10, Rgb(1, 2, 3));
        buf.paint(&solid_mask(2, 2, 255), -5, -5, Rgb(1, 2, 3));
        assert!(buf.is_transparent());
    }

    #[test]
    fn test_ink_bounds_grow_with_each_paint() {
        let mut buf = GlyphBuffer::transparent(20, 20);
        buf.paint(&solid_mask(2, 2, 255), 1, 1, Rgb(0, 0, 0));
        buf.paint(&solid_mask(2, 2, 255), 10, 12, Rgb(0, 0, 0));
        let ink = buf.ink_bounds().unwrap();
        assert_eq!((ink.x0, ink.y0, ink.x1, ink.y1), (1, 1, 12, 14));
        assert_eq!((ink.width(), ink.height()), (11, 13));
    }

    #[test]
    fn test_empty_mask_is_noop() {
        let mut buf = GlyphBuffer::transparent(4, 4);
        buf.paint(&CoverageMask::empty(), 0, 0, Rgb(1, 2, 3));
        assert!(buf.is_transparent());
    }
}
