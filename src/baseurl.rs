//! Base directory to URL translation.
//!
//! Mendeley stores file locations as absolute `file:///` URLs, which are
//! useless across machines. The text database stores names relative to a
//! configured base directory instead. [`BaseUrl`] is the bridge: it turns
//! the base directory into a canonical URL prefix and converts locations
//! between the two forms.

use std::path::Path;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::{Error, Result};

/// Characters escaped in the URL form of the base path. Unreserved
/// characters plus `/` and `:` pass through, matching
/// `urllib.quote(path, safe='/:')`.
const PATH_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b':')
    .remove(b'_')
    .remove(b'.')
    .remove(b'-');

/// The base directory in canonical absolute-URL form, without a trailing
/// slash, e.g. `file:///home/u/pdfs`.
///
/// The leading slash of the absolute path is folded into the `file:///`
/// prefix so Linux and Windows bases produce the same shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
    url: String,
}

impl BaseUrl {
    /// Build the URL form of a base directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be absolutized or is not
    /// valid UTF-8.
    pub fn new(directory: &Path) -> Result<Self> {
        let absolute = std::path::absolute(directory)?;
        let path = absolute.to_str().ok_or_else(|| {
            Error::Config(format!(
                "Base directory path is not valid UTF-8: {}",
                absolute.display()
            ))
        })?;

        let mut path = path.replace(std::path::MAIN_SEPARATOR, "/");
        if let Some(stripped) = path.strip_prefix('/') {
            path = stripped.to_string();
        }
        if let Some(stripped) = path.strip_suffix('/') {
            path = stripped.to_string();
        }

        let encoded = utf8_percent_encode(&path, PATH_ESCAPE).to_string();
        Ok(Self {
            url: format!("file:///{encoded}"),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Strip the base prefix from an absolute URL.
    ///
    /// URLs outside the base are returned unchanged; they keep their
    /// scheme, which is how external references are recognised downstream.
    #[must_use]
    pub fn to_relative(&self, absolute_url: &str) -> String {
        let prefix = format!("{}/", self.url);
        absolute_url
            .strip_prefix(&prefix)
            .unwrap_or(absolute_url)
            .to_string()
    }

    /// Join a relative name back onto the base URL. Only called for names
    /// already confirmed relative.
    #[must_use]
    pub fn to_absolute(&self, name: &str) -> String {
        format!("{}/{name}", self.url)
    }
}
