//! Source providers: turn a [`SourceLocator`] into decoded audio.

use std::fs::File;
use std::path::Path;

use djdeck_core::{Error, Result, SourceLocator};
use tracing::debug;
use url::Url;

use crate::decode::{extension_for_mime, AudioDecoder, DecodedAudio};

/// Upper bound on a fetched remote body.
const MAX_REMOTE_BYTES: u64 = 512 * 1024 * 1024;

/// Opens and fully decodes a track. Called on the control thread only.
pub trait SourceProvider: Send + Sync {
    fn open_source(&self, locator: &SourceLocator) -> Result<DecodedAudio>;
}

/// Local files through symphonia, `http(s)` through ureq.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSourceProvider;

impl DefaultSourceProvider {
    fn open_file(path: &Path, locator: &SourceLocator) -> Result<DecodedAudio> {
        let file = File::open(path).map_err(|e| Error::source_open(locator, e))?;
        let extension = locator.extension();
        AudioDecoder::new(Box::new(file), extension.as_deref())?.decode_all()
    }

    fn fetch(url: &Url, locator: &SourceLocator) -> Result<DecodedAudio> {
        debug!("Fetching {url}");
        let mut body = ureq::get(url.as_str())
            .call()
            .map_err(|e| Error::Network(format!("HTTP request failed: {e}")))?
            .into_body();

        let mime_hint = body.mime_type().and_then(extension_for_mime);
        let data = body
            .with_config()
            .limit(MAX_REMOTE_BYTES)
            .read_to_vec()
            .map_err(|e| Error::Network(format!("Failed to read response: {e}")))?;

        debug!("Fetched {} bytes from {url}", data.len());
        let extension = locator.extension();
        AudioDecoder::from_bytes(data, extension.as_deref().or(mime_hint))?.decode_all()
    }
}

impl SourceProvider for DefaultSourceProvider {
    fn open_source(&self, locator: &SourceLocator) -> Result<DecodedAudio> {
        match locator {
            SourceLocator::File(path) => Self::open_file(path, locator),
            SourceLocator::Remote(url) => Self::fetch(url, locator),
        }
    }
}
