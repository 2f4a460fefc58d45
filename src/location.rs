//! Addressable location of the current view
//!
//! The active date range is mirrored into the `from`/`to` query parameters
//! so a view can be shared or bookmarked.

use parking_lot::Mutex;
use url::Url;

use crate::error::Result;

/// Where the view's query parameters live
pub trait Location: Send + Sync {
    /// Read one query parameter
    fn query_param(&self, key: &str) -> Option<String>;

    /// Replace `from` and `to`, keeping every other parameter
    fn replace_range(&self, from: &str, to: &str);
}

/// Location backed by a URL
pub struct UrlLocation {
    url: Mutex<Url>,
}

impl UrlLocation {
    pub fn new(url: Url) -> Self {
        Self {
            url: Mutex::new(url),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(Self::new(Url::parse(raw)?))
    }

    /// Current shareable link
    pub fn href(&self) -> String {
        self.url.lock().to_string()
    }
}

impl Location for UrlLocation {
    fn query_param(&self, key: &str) -> Option<String> {
        self.url
            .lock()
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    fn replace_range(&self, from: &str, to: &str) {
        let mut url = self.url.lock();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "from" && k != "to")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("from", from)
            .append_pair("to", to);
    }
}
