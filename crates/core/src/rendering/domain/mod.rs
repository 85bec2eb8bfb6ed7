pub mod caption_painter;
pub mod frame_compositor;
pub mod glyph_buffer;
pub mod render_error;
pub mod style;
pub mod text_rasterizer;
