use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::captioning::domain::caption_interval::CaptionInterval;

#[derive(Error, Debug)]
pub enum CaptionStoreError {
    #[error("caption file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed caption on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode caption: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("caption stream I/O failed: {0}")]
    Stream(#[source] std::io::Error),
}

/// Stores captions one JSON object per line:
/// `{"start":1.0,"end":1.5,"text":"hello there"}`.
///
/// Lets a transcription be reused across render experiments.
pub struct JsonlCaptionStore;

impl JsonlCaptionStore {
    pub fn save(path: &Path, captions: &[CaptionInterval]) -> Result<(), CaptionStoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let file = File::create(path).map_err(|e| io_error(path, e))?;
        let mut writer = BufWriter::new(file);
        Self::write(&mut writer, captions)?;
        writer.flush().map_err(|e| io_error(path, e))
    }

    pub fn load(path: &Path) -> Result<Vec<CaptionInterval>, CaptionStoreError> {
        let file = File::open(path).map_err(|e| io_error(path, e))?;
        Self::read(BufReader::new(file))
    }

    pub fn write<W: Write>(writer: &mut W, captions: &[CaptionInterval]) -> Result<(), CaptionStoreError> {
        for caption in captions {
            serde_json::to_writer(&mut *writer, caption).map_err(CaptionStoreError::Encode)?;
            writer.write_all(b"\n").map_err(CaptionStoreError::Stream)?;
        }
        Ok(())
    }

    /// Blank lines are skipped; line numbers in errors are 1-based.
    pub fn read<R: BufRead>(reader: R) -> Result<Vec<CaptionInterval>, CaptionStoreError> {
        let mut captions = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(CaptionStoreError::Stream)?;
            if line.trim().is_empty() {
                continue;
            }
            let caption = serde_json::from_str(&line).map_err(|source| CaptionStoreError::Parse {
                line: i + 1,
                source,
            })?;
            captions.push(caption);
        }
        Ok(captions)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CaptionStoreError {
    CaptionStoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}
