use std::fmt;

use http::Method;

/// Key under which a response is stored.
///
/// Only `GET` exchanges are stored, so a key is the absolute URL prefixed
/// with the method.
///
/// ```
/// use cachecall_store::StoreKey;
///
/// let key = StoreKey::get("https://api.example.com/users?page=2");
/// assert_eq!(key.as_str(), "GET https://api.example.com/users?page=2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey(String);

impl StoreKey {
    /// Key of the `GET` exchange for `url`.
    pub fn get(url: impl AsRef<str>) -> Self {
        Self::new(&Method::GET, url)
    }

    /// Key for an arbitrary method and URL.
    pub fn new(method: &Method, url: impl AsRef<str>) -> Self {
        Self(format!("{} {}", method, url.as_ref()))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the key as raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
