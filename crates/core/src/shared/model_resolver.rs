use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

const APP_DIR: &str = "captionburn";
const READ_CHUNK: usize = 256 * 1024;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("download of {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Returns the cached speech model `name`, downloading it from `url` on
/// first use.
pub fn resolve(
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_cache_dir()?, name, url, progress)
}

/// Like [`resolve`], with an explicit cache directory.
pub fn resolve_in(
    cache_dir: &Path,
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        log::debug!("Using cached model {}", cached_path.display());
        return Ok(cached_path);
    }

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {name} from {url}");
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform cache directory for downloaded models, e.g.
/// `~/.cache/captionburn/models` on Linux.
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    dirs::cache_dir()
        .map(|d| d.join(APP_DIR).join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let download_error = |source| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };
    let mut response = reqwest::blocking::get(url).map_err(download_error)?;
    if !response.status().is_success() {
        return Err(ModelResolveError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let total = response.content_length().unwrap_or(0);
    let temp_path = dest.with_extension("part");
    let write_error = |source| ModelResolveError::Write {
        path: temp_path.clone(),
        source,
    };

    // Stream into a sibling file and rename, so an interrupted download
    // never leaves a truncated model at `dest`.
    let result = (|| {
        let mut file = fs::File::create(&temp_path).map_err(write_error)?;
        let mut buf = vec![0u8; READ_CHUNK];
        let mut downloaded: u64 = 0;
        loop {
            let n = response.read(&mut buf).map_err(write_error)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).map_err(write_error)?;
            downloaded += n as u64;
            if let Some(ref cb) = progress {
                cb(downloaded, total);
            }
        }
        file.flush().map_err(write_error)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })
}
