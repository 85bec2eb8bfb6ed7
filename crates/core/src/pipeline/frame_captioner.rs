use crate::captioning::domain::caption_cursor::CaptionCursor;
use crate::captioning::domain::caption_interval::CaptionTimeline;
use crate::rendering::domain::frame_compositor::FrameCompositor;
use crate::rendering::domain::glyph_buffer::GlyphBuffer;
use crate::rendering::domain::render_error::RenderError;
use crate::rendering::domain::style::StyleConfig;
use crate::rendering::domain::text_rasterizer::TextRasterizer;
use crate::shared::frame::Frame;

/// The last caption rendered, keyed by its timeline index and canvas.
/// `glyphs` is `None` when the caption renders to nothing.
struct CachedCaption {
    index: usize,
    canvas: (u32, u32),
    glyphs: Option<GlyphBuffer>,
}

/// Per-frame captioning step: cursor lookup, rasterization and compositing.
///
/// Owns the cursor and the rasterizer for one render pass. Only the most
/// recent caption's glyphs are kept, so memory stays flat regardless of
/// video length while a caption that spans many frames is rendered once.
///
/// Error policy:
/// - empty caption text renders nothing;
/// - any other rasterization failure is logged once for that caption and
///   its frames pass through uncaptioned;
/// - a font that fails to load, a non-monotonic frame time or a frame the
///   overlay cannot be composited onto aborts the pass.
pub struct FrameCaptioner {
    cursor: CaptionCursor,
    rasterizer: Box<dyn TextRasterizer>,
    style: StyleConfig,
    cached: Option<CachedCaption>,
    renders: usize,
    failures: usize,
}

impl FrameCaptioner {
    pub fn new(
        timeline: CaptionTimeline,
        rasterizer: Box<dyn TextRasterizer>,
        style: StyleConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        style.validate()?;
        Ok(Self::with_cursor(CaptionCursor::new(timeline), rasterizer, style))
    }

    /// Starts from an already positioned cursor, e.g. one made with
    /// [`CaptionCursor::starting_at`] for a pass that begins mid-video.
    pub fn with_cursor(
        cursor: CaptionCursor,
        rasterizer: Box<dyn TextRasterizer>,
        style: StyleConfig,
    ) -> Self {
        Self {
            cursor,
            rasterizer,
            style,
            cached: None,
            renders: 0,
            failures: 0,
        }
    }

    /// Advances to `t` and returns the overlay to draw, if any.
    pub fn overlay_at(
        &mut self,
        t: f64,
        canvas: (u32, u32),
    ) -> Result<Option<&GlyphBuffer>, Box<dyn std::error::Error>> {
        if self.cursor.advance(t)?.is_none() {
            return Ok(None);
        }
        let index = self.cursor.index();
        let active = &self.cursor.timeline()[index];

        let fresh = matches!(&self.cached, Some(c) if c.index == index && c.canvas == canvas);
        if !fresh {
            self.renders += 1;
            let glyphs = match self.rasterizer.render(&active.text, &self.style, canvas) {
                Ok(buffer) => Some(buffer),
                Err(RenderError::EmptyText) => None,
                Err(e @ RenderError::FontLoad { .. }) => return Err(e.into()),
                Err(e) => {
                    self.failures += 1;
                    log::warn!(
                        "Caption {index} ({:.2}s-{:.2}s, {:?}) left off: {e}",
                        active.start,
                        active.end,
                        active.text
                    );
                    None
                }
            };
            self.cached = Some(CachedCaption {
                index,
                canvas,
                glyphs,
            });
        }

        Ok(self.cached.as_ref().and_then(|c| c.glyphs.as_ref()))
    }

    /// Burns the caption active at the frame's timestamp into `frame`.
    /// Returns whether any caption pixel was drawn.
    pub fn caption_frame(&mut self, frame: &mut Frame) -> Result<bool, Box<dyn std::error::Error>> {
        let Some(overlay) = self.overlay_at(frame.timestamp(), frame.canvas())? else {
            return Ok(false);
        };
        FrameCompositor::composite_into(frame, overlay)?;
        Ok(!overlay.is_transparent())
    }

    pub fn cursor(&self) -> &CaptionCursor {
        &self.cursor
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    /// Number of times the rasterizer has been invoked.
    pub fn renders(&self) -> usize {
        self.renders
    }

    /// Number of captions skipped because they failed to render.
    pub fn failures(&self) -> usize {
        self.failures
    }
}
