use ndarray::{s, Axis, Zip};

use crate::shared::frame::Frame;

use super::glyph_buffer::GlyphBuffer;
use super::render_error::RenderError;

/// Straight-alpha "over" of a caption buffer onto a video frame.
pub struct FrameCompositor;

impl FrameCompositor {
    /// Returns a new frame with `overlay` blended on top; `frame` is untouched.
    pub fn composite(frame: &Frame, overlay: &GlyphBuffer) -> Result<Frame, RenderError> {
        let mut out = frame.clone();
        Self::composite_into(&mut out, overlay)?;
        Ok(out)
    }

    /// Blends `overlay` onto `frame` in place. Only the overlay's ink box is
    /// visited; pixels with zero alpha are left exactly as they were.
    pub fn composite_into(frame: &mut Frame, overlay: &GlyphBuffer) -> Result<(), RenderError> {
        if !frame.is_color() {
            return Err(RenderError::UnsupportedChannels(frame.channels()));
        }
        if (overlay.width(), overlay.height()) != frame.canvas() {
            return Err(RenderError::CanvasMismatch {
                overlay_width: overlay.width(),
                overlay_height: overlay.height(),
                frame_width: frame.width(),
                frame_height: frame.height(),
            });
        }
        let Some(ink) = overlay.ink_bounds() else {
            return Ok(());
        };

        let (x0, y0, x1, y1) = (
            ink.x0 as usize,
            ink.y0 as usize,
            ink.x1 as usize,
            ink.y1 as usize,
        );
        let image = overlay.as_image();
        let mut frame_view = frame.as_ndarray_mut();
        let mut target = frame_view.slice_mut(s![y0..y1, x0..x1, ..]);

        Zip::indexed(target.lanes_mut(Axis(2))).for_each(|(row, col), mut dst| {
            let src = image.get_pixel((x0 + col) as u32, (y0 + row) as u32).0;
            let alpha = src[3] as u32;
            if alpha == 0 {
                return;
            }
            let inv = 255 - alpha;
            for c in 0..3 {
                dst[c] = ((src[c] as u32 * alpha + dst[c] as u32 * inv + 127) / 255) as u8;
            }
        });

        Ok(())
    }
}
