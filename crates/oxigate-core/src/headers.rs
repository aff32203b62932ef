//! Header-injection policy: extra headers for specific outgoing URLs.
//!
//! Applied after every provider-specific header, so a policy entry can
//! override anything the profile set.

use crate::config::HeaderRule;

/// Contributes headers for an outgoing upstream URL.
pub trait HeaderPolicy: Send + Sync {
    /// Headers to add or override for a call to `url`, in application order.
    fn headers_for(&self, url: &str) -> Vec<(String, String)>;
}

/// A policy that never adds anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoExtraHeaders;

impl HeaderPolicy for NoExtraHeaders {
    fn headers_for(&self, _url: &str) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Prefix-matched rules from the `additionalHeaders` config section.
///
/// Every matching rule contributes; later rules win on conflicts.
#[derive(Clone, Debug, Default)]
pub struct ConfigHeaderPolicy {
    rules: Vec<HeaderRule>,
}

impl ConfigHeaderPolicy {
    pub fn new(rules: Vec<HeaderRule>) -> Self {
        Self { rules }
    }
}

impl HeaderPolicy for ConfigHeaderPolicy {
    fn headers_for(&self, url: &str) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for rule in self.rules.iter().filter(|r| url.starts_with(&r.url_prefix)) {
            let mut pairs: Vec<_> = rule.headers.iter().collect();
            pairs.sort();
            out.extend(pairs.into_iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        out
    }
}
