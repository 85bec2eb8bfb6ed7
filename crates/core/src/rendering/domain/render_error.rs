use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("failed to load font {path}: {reason}")]
    FontLoad { path: PathBuf, reason: String },
    #[error("caption text is empty")]
    EmptyText,
    #[error("could not rasterize caption: {0}")]
    Rasterize(String),
    #[error("overlay is {overlay_width}x{overlay_height} but frame is {frame_width}x{frame_height}")]
    CanvasMismatch {
        overlay_width: u32,
        overlay_height: u32,
        frame_width: u32,
        frame_height: u32,
    },
    #[error("cannot composite onto a frame with {0} channels")]
    UnsupportedChannels(u8),
}
