use std::path::{Path, PathBuf};

use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};

use crate::rendering::domain::caption_painter::CaptionPainter;
use crate::rendering::domain::glyph_buffer::{CoverageMask, GlyphBuffer};
use crate::rendering::domain::render_error::RenderError;
use crate::rendering::domain::style::StyleConfig;
use crate::rendering::domain::text_rasterizer::TextRasterizer;

/// Widest or tallest glyph run, in pixels, a caption may rasterize to.
pub const MAX_CAPTION_EXTENT: u32 = 16384;

/// Rasterizes captions from a TrueType/OpenType font via fontdue.
///
/// The font is parsed once in the constructor and reused for every frame.
pub struct FontdueRasterizer {
    font: Font,
    path: PathBuf,
}

impl FontdueRasterizer {
    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path).map_err(|e| RenderError::FontLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_bytes(bytes, path)
    }

    /// `origin` is only used for error messages and [`Self::path`].
    pub fn from_bytes(bytes: Vec<u8>, origin: &Path) -> Result<Self, RenderError> {
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|reason| {
            RenderError::FontLoad {
                path: origin.to_path_buf(),
                reason: reason.to_string(),
            }
        })?;
        log::debug!("Loaded font {}", origin.display());
        Ok(Self {
            font,
            path: origin.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rasterizes `text` at `px` and crops the result to its tight ink box.
    ///
    /// Returns an empty mask if no glyph produces ink (e.g. only spaces).
    /// The ink box is measured from the layout first, so a run wider or
    /// taller than [`MAX_CAPTION_EXTENT`] fails before any bitmap is made.
    pub fn rasterize_mask(&self, text: &str, px: f32) -> Result<CoverageMask, RenderError> {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings::default());
        layout.append(&[&self.font], &TextStyle::new(text, px, 0));

        let inked: Vec<_> = layout
            .glyphs()
            .iter()
            .filter(|g| g.width > 0 && g.height > 0)
            .collect();
        let laid_out = inked.iter().map(|g| Placement {
            x: g.x.round() as i32,
            y: g.y.round() as i32,
            width: g.width,
            height: g.height,
        });
        let Some((left, top, right, bottom)) = ink_box(laid_out) else {
            return Ok(CoverageMask::empty());
        };
        check_extent(i64::from(right) - i64::from(left), i64::from(bottom) - i64::from(top))?;

        let placed: Vec<PlacedGlyph> = inked
            .iter()
            .map(|g| {
                let (metrics, bitmap) = self.font.rasterize_config(g.key);
                PlacedGlyph {
                    at: Placement {
                        x: g.x.round() as i32,
                        y: g.y.round() as i32,
                        width: metrics.width,
                        height: metrics.height,
                    },
                    bitmap,
                }
            })
            .filter(|g| g.at.width > 0 && g.at.height > 0)
            .collect();

        let Some((left, top, right, bottom)) = ink_box(placed.iter().map(|g| g.at)) else {
            return Ok(CoverageMask::empty());
        };
        let width = (right - left) as u32;
        let height = (bottom - top) as u32;
        check_extent(width.into(), height.into())?;

        let mut data = vec![0u8; (width as usize) * (height as usize)];
        for glyph in &placed {
            let at = glyph.at;
            for row in 0..at.height {
                let my = (at.y - top) as usize + row;
                for col in 0..at.width {
                    let mx = (at.x - left) as usize + col;
                    let coverage = glyph.bitmap[row * at.width + col];
                    let cell = &mut data[my * width as usize + mx];
                    *cell = (*cell).max(coverage);
                }
            }
        }

        Ok(CoverageMask::new(data, width, height))
    }
}

fn check_extent(width: i64, height: i64) -> Result<(), RenderError> {
    let limit = i64::from(MAX_CAPTION_EXTENT);
    if width > limit || height > limit {
        return Err(RenderError::Rasterize(format!(
            "glyph run is {width}x{height} px, limit is {MAX_CAPTION_EXTENT}"
        )));
    }
    Ok(())
}

impl TextRasterizer for FontdueRasterizer {
    fn render(
        &self,
        text: &str,
        style: &StyleConfig,
        canvas: (u32, u32),
    ) -> Result<GlyphBuffer, RenderError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RenderError::EmptyText);
        }
        let mask = self.rasterize_mask(text, style.font_size as f32)?;
        Ok(CaptionPainter::paint(&mask, style, canvas))
    }
}

#[derive(Clone, Copy)]
struct Placement {
    x: i32,
    y: i32,
    width: usize,
    height: usize,
}

struct PlacedGlyph {
    at: Placement,
    bitmap: Vec<u8>,
}

/// `(left, top, right, bottom)` enclosing every placement.
fn ink_box(glyphs: impl Iterator<Item = Placement>) -> Option<(i32, i32, i32, i32)> {
    glyphs.fold(None, |acc, g| {
        let (l, t, r, b) = (g.x, g.y, g.x + g.width as i32, g.y + g.height as i32);
        Some(match acc {
            None => (l, t, r, b),
            Some((al, at, ar, ab)) => (al.min(l), at.min(t), ar.max(r), ab.max(b)),
        })
    })
}
