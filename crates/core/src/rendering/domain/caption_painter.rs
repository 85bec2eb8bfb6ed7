use super::glyph_buffer::{CoverageMask, GlyphBuffer};
use super::style::{Anchor, StyleConfig};

/// Lays a rasterized glyph run onto a frame-sized canvas.
pub struct CaptionPainter;

impl CaptionPainter {
    /// Top-left corner that centres a `width` x `height` ink box on `anchor`,
    /// using floor division for odd sizes.
    pub fn draw_origin(anchor: Anchor, width: u32, height: u32) -> (i32, i32) {
        (
            anchor.x - (width / 2) as i32,
            anchor.y - (height / 2) as i32,
        )
    }

    /// Draws the outline (one stamp per offset in the `[-r, r]` square, centre
    /// excluded) and then the fill on top, so fill wins wherever both land.
    pub fn paint(mask: &CoverageMask, style: &StyleConfig, canvas: (u32, u32)) -> GlyphBuffer {
        let (width, height) = canvas;
        let mut buffer = GlyphBuffer::transparent(width, height);
        if mask.is_empty() {
            return buffer;
        }

        let (x, y) = Self::draw_origin(style.anchor, mask.width(), mask.height());

        let r = style.outline.effective_radius() as i32;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx == 0 && dy == 0 {
                    continue;
                }
                buffer.paint(mask, x + dx, y + dy, style.outline.color);
            }
        }

        buffer.paint(mask, x, y, style.color);
        buffer
    }
}
