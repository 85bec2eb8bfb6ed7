use super::glyph_buffer::GlyphBuffer;
use super::render_error::RenderError;
use super::style::StyleConfig;

/// Renders a single line of caption text onto a transparent canvas.
///
/// Implementations own their font, loaded once when they are constructed,
/// so a render pass never reopens the font file per frame.
pub trait TextRasterizer: Send {
    /// Returns a `canvas`-sized buffer with `text` centred on
    /// `style.anchor`. Fails with [`RenderError::EmptyText`] if `text` is
    /// blank.
    fn render(
        &self,
        text: &str,
        style: &StyleConfig,
        canvas: (u32, u32),
    ) -> Result<GlyphBuffer, RenderError>;
}
