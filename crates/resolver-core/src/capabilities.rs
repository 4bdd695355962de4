//! External collaborators the core consumes through narrow interfaces:
//! UserAgent parsing, geolocation resolution, and specification
//! persistence. Each is out of scope for this core's own logic — the core
//! only depends on the trait, never a concrete parser/HTTP client/on-disk
//! format.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::model::{ParsedUserAgent, Specification};

/// Maps a raw `User-Agent` string to the structured fields the condition
/// evaluator needs.
pub trait UserAgentParser: Send + Sync {
    /// Parse `user_agent` into whatever OS/device fields can be
    /// determined. Never fails — an unrecognized UA yields an all-`None`
    /// result.
    fn parse(&self, user_agent: &str) -> ParsedUserAgent;
}

/// Geo information resolved from a client IP address.
#[derive(Debug, Clone, Default)]
pub struct GeoInfo {
    /// ISO country code or name, as resolved.
    pub country: Option<String>,
    /// Region/subdivision, as resolved.
    pub region: Option<String>,
}

/// Maps a client IP to geo information. May fail to resolve but must never
/// throw/panic — callers treat `None`/`Err` identically as "no geo data".
#[async_trait]
pub trait GeoResolver: Send + Sync {
    /// Attempt to resolve `ip` to geo information.
    async fn resolve(&self, ip: &str) -> Option<GeoInfo>;
}

/// Read-all-on-init, write-on-save persistence for specifications.
#[async_trait]
pub trait SpecificationPersistence: Send + Sync {
    /// Load every persisted specification, e.g. at server startup.
    async fn load_all(&self) -> Result<Vec<Specification>>;

    /// Persist one specification (create or replace).
    async fn save(&self, spec: &Specification) -> Result<()>;
}

/// Regex-based default [`UserAgentParser`]. Recognizes the common mobile
/// platform tokens; anything else yields `None` fields rather than an
/// error, per the trait's contract.
pub struct RegexUserAgentParser {
    ios: Regex,
    android: Regex,
    tablet: Regex,
    phone: Regex,
}

static DEFAULT_IOS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)iOS|iPhone OS|iPadOS").unwrap());
static DEFAULT_ANDROID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Android").unwrap());
static DEFAULT_TABLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)iPad|Tablet").unwrap());
static DEFAULT_PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)iPhone|Mobile").unwrap());

impl Default for RegexUserAgentParser {
    fn default() -> Self {
        Self {
            ios: DEFAULT_IOS.clone(),
            android: DEFAULT_ANDROID.clone(),
            tablet: DEFAULT_TABLET.clone(),
            phone: DEFAULT_PHONE.clone(),
        }
    }
}

impl UserAgentParser for RegexUserAgentParser {
    fn parse(&self, user_agent: &str) -> ParsedUserAgent {
        let os_name = if self.ios.is_match(user_agent) {
            Some("iOS".to_string())
        } else if self.android.is_match(user_agent) {
            Some("Android".to_string())
        } else {
            None
        };

        let device_type = if self.tablet.is_match(user_agent) {
            Some("tablet".to_string())
        } else if self.phone.is_match(user_agent) {
            Some("phone".to_string())
        } else {
            None
        };

        ParsedUserAgent {
            os_name,
            device_type,
        }
    }
}

/// A [`GeoResolver`] that never resolves anything. Real IP geolocation is
/// explicitly out of scope here; callers that need it wire their own
/// implementation of the trait.
#[derive(Debug, Clone, Default)]
pub struct NullGeoResolver;

#[async_trait]
impl GeoResolver for NullGeoResolver {
    async fn resolve(&self, _ip: &str) -> Option<GeoInfo> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ios_phone() {
        let parser = RegexUserAgentParser::default();
        let parsed = parser.parse("GovUK.App/0.0.2 (iOS 17.0; iPhone)");
        assert_eq!(parsed.os_name.as_deref(), Some("iOS"));
        assert_eq!(parsed.device_type.as_deref(), Some("phone"));
    }

    #[test]
    fn parses_android() {
        let parser = RegexUserAgentParser::default();
        let parsed = parser.parse("Mozilla/5.0 (Linux; Android 14)");
        assert_eq!(parsed.os_name.as_deref(), Some("Android"));
    }

    #[test]
    fn unknown_ua_yields_none_fields() {
        let parser = RegexUserAgentParser::default();
        let parsed = parser.parse("curl/8.0");
        assert_eq!(parsed.os_name, None);
        assert_eq!(parsed.device_type, None);
    }

    #[tokio::test]
    async fn null_geo_resolver_always_none() {
        let resolver = NullGeoResolver;
        assert!(resolver.resolve("1.2.3.4").await.is_none());
    }
}
