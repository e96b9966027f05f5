//! Template loading.
//!
//! A template reference is either a local path or an `https://` URL. The
//! referenced document is read as raw bytes and decoded into a
//! [`DesiredConfig`]. The file templates inside it (pull request and issue
//! templates) may use the same kinds of reference, see [`read_content`].
//!
//! ```no_run
//! use repokit::template;
//!
//! let cfg = template::load("templates/service.json").unwrap();
//! println!("signed commits: {}", cfg.required_signed_commits);
//! ```

use crate::error::{RemoteError, TemplateError};
use crate::types::DesiredConfig;
use std::path::{Path, PathBuf};

/// Prefix that marks a reference as remote.
const REMOTE_PREFIX: &str = "https://";

/// Maximum template document size (templates are small JSON files).
const MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

/// Where a template document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// A file on the local filesystem.
    Local(PathBuf),
    /// A document served over HTTPS.
    Remote(String),
}

impl TemplateSource {
    /// Classify a reference by its prefix.
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        if reference.starts_with(REMOTE_PREFIX) {
            Self::Remote(reference.to_string())
        } else {
            Self::Local(PathBuf::from(reference))
        }
    }

    /// Read the raw document bytes.
    pub fn read(&self) -> Result<Vec<u8>, TemplateError> {
        match self {
            Self::Local(path) => read_file(path),
            Self::Remote(url) => fetch_url(url),
        }
    }
}

/// Load and decode the template at `reference`.
pub fn load(reference: &str) -> Result<DesiredConfig, TemplateError> {
    log::debug!("loading repo config from {reference}");

    let data = TemplateSource::parse(reference).read()?;
    parse(&data, reference)
}

/// Decode template bytes into a [`DesiredConfig`].
pub fn parse(data: &[u8], reference: &str) -> Result<DesiredConfig, TemplateError> {
    serde_json::from_slice(data).map_err(|cause| TemplateError::Parse {
        reference: reference.to_string(),
        cause,
    })
}

/// Resolve a file template value to the bytes to write.
///
/// An `https://` URL is downloaded and a path to an existing local file is
/// read; any other value is the content itself.
pub fn read_content(value: &str) -> Result<Vec<u8>, TemplateError> {
    if value.starts_with(REMOTE_PREFIX) || Path::new(value).is_file() {
        log::debug!("reading file template from {value}");
        return TemplateSource::parse(value).read();
    }
    Ok(value.as_bytes().to_vec())
}

fn read_file(path: &Path) -> Result<Vec<u8>, TemplateError> {
    std::fs::read(path).map_err(|cause| TemplateError::Io {
        path: path.to_path_buf(),
        cause,
    })
}

fn fetch_url(url: &str) -> Result<Vec<u8>, TemplateError> {
    let fetch_err = |cause: RemoteError| TemplateError::Fetch {
        url: url.to_string(),
        cause,
    };

    let mut response = ureq::get(url)
        .header("User-Agent", crate::USER_AGENT)
        .call()
        .map_err(|e| fetch_err(e.into()))?;

    response
        .body_mut()
        .with_config()
        .limit(MAX_BODY_SIZE)
        .read_to_vec()
        .map_err(|e| fetch_err(e.into()))
}
