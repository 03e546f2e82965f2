//! Input resolution: normalise a user-supplied PDF path or URL to a local
//! file, and check the optional DOCX template exists.
//!
//! URL inputs are downloaded into a `TempDir` that lives inside
//! [`ResolvedInput`], so the file is removed when the run ends, even on
//! panic. The `%PDF` magic is checked before returning so a wrong file type
//! fails here with [`SummaryError::NotAPdf`] rather than deep inside lopdf.

use crate::error::SummaryError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// The resolved PDF input: a local path or a downloaded temp file.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; PDF downloaded to a temp directory kept alive here.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file path.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, SummaryError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(Path::new(input))
    }
}

/// Check that a template, when given, exists and is readable.
pub fn resolve_template(template: Option<&Path>) -> Result<Option<PathBuf>, SummaryError> {
    let Some(path) = template else {
        return Ok(None);
    };
    if !path.is_file() {
        return Err(SummaryError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }
    if let Err(e) = std::fs::File::open(path) {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            return Err(SummaryError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        return Err(SummaryError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }
    debug!("Resolved template: {}", path.display());
    Ok(Some(path.to_path_buf()))
}

fn resolve_local(path: &Path) -> Result<ResolvedInput, SummaryError> {
    if !path.exists() {
        return Err(SummaryError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(SummaryError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SummaryError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(SummaryError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path.to_path_buf()))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, SummaryError> {
    info!("Downloading PDF from: {}", url);
    let failed = |reason: String| SummaryError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    let temp_dir = TempDir::new().map_err(|e| SummaryError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(filename_from_url(url));

    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(SummaryError::NotAPdf {
            path: file_path,
            magic,
        });
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| SummaryError::Internal(format!("Failed to write temp file: {e}")))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(last) = parsed.path_segments().and_then(|mut s| s.next_back()) {
            if !last.is_empty() && last.contains('.') {
                return last.to_string();
            }
        }
    }
    "case.pdf".to_string()
}
