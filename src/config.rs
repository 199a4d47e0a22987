// Statful - A buffered UDP metrics client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::sampler::SampleRate;
use crate::tags::{GlobalTags, TagPrecedence, TagSet};
use crate::types::AggregationFrequency;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 2013;
pub const DEFAULT_NAMESPACE: &str = "application";

/// Settings shared by every metric a client emits.
///
/// A configuration is a plain value: it is built up front and handed to a
/// client, which never changes it. To change settings, build a new
/// configuration and pass it to `StatfulClient::with_config`.
///
/// # Example
///
/// ```
/// use statful::{AggregationFrequency, ClientConfig, SampleRate};
///
/// let config = ClientConfig::new("my.app")
///     .with_environment("production")
///     .with_tag("region", "eu-west-1")
///     .with_namespace("checkout")
///     .with_sample_rate(SampleRate::try_from(50).unwrap())
///     .with_agg_freq(AggregationFrequency::OneMinute);
///
/// assert_eq!("checkout", config.namespace());
/// assert_eq!(60, config.agg_freq().as_secs());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    host: String,
    port: u16,
    prefix: String,
    tags: GlobalTags,
    namespace: String,
    sample_rate: SampleRate,
    agg_freq: AggregationFrequency,
    precedence: TagPrecedence,
    persistent: bool,
    mock: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            prefix: String::new(),
            tags: GlobalTags::default(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            sample_rate: SampleRate::ALWAYS,
            agg_freq: AggregationFrequency::default(),
            precedence: TagPrecedence::default(),
            persistent: true,
            mock: false,
        }
    }
}

impl ClientConfig {
    pub fn new(prefix: &str) -> Self {
        ClientConfig {
            prefix: prefix.to_string(),
            ..Self::default()
        }
    }

    /// Collector address. Defaults to `127.0.0.1:2013`.
    #[must_use]
    pub fn with_target(mut self, host: &str, port: u16) -> Self {
        self.host = host.to_string();
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: &str) -> Self {
        self.tags.environment = environment.to_string();
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: &str) -> Self {
        self.tags.platform = platform.to_string();
        self
    }

    #[must_use]
    pub fn with_app(mut self, app: &str) -> Self {
        self.tags.app = app.to_string();
        self
    }

    /// Add a custom tag applied to every metric.
    #[must_use]
    pub fn with_tag<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags.custom.insert(key, value);
        self
    }

    /// Replace all custom tags applied to every metric.
    #[must_use]
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags.custom = tags;
        self
    }

    /// Namespace used when a metric doesn't set one. Defaults to `application`.
    #[must_use]
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    /// Sample rate used when a metric doesn't set one. Defaults to 100.
    #[must_use]
    pub fn with_sample_rate(mut self, rate: SampleRate) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Aggregation frequency used when a metric doesn't set one. Defaults
    /// to 10 seconds.
    #[must_use]
    pub fn with_agg_freq(mut self, freq: AggregationFrequency) -> Self {
        self.agg_freq = freq;
        self
    }

    #[must_use]
    pub fn with_tag_precedence(mut self, precedence: TagPrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    /// Keep the transport open between calls to `send()`. Defaults to `true`.
    #[must_use]
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Divert flushed metrics to the mock sink instead of the transport.
    /// Defaults to `false`.
    #[must_use]
    pub fn with_mock(mut self, mock: bool) -> Self {
        self.mock = mock;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn tags(&self) -> &GlobalTags {
        &self.tags
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    pub fn agg_freq(&self) -> AggregationFrequency {
        self.agg_freq
    }

    pub fn tag_precedence(&self) -> TagPrecedence {
        self.precedence
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn is_mock(&self) -> bool {
        self.mock
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientConfig, DEFAULT_HOST, DEFAULT_NAMESPACE, DEFAULT_PORT};
    use crate::sampler::SampleRate;
    use crate::tags::TagPrecedence;
    use crate::types::AggregationFrequency;

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::default();

        assert_eq!(DEFAULT_HOST, config.host());
        assert_eq!(DEFAULT_PORT, config.port());
        assert_eq!("", config.prefix());
        assert_eq!(DEFAULT_NAMESPACE, config.namespace());
        assert_eq!(SampleRate::ALWAYS, config.sample_rate());
        assert_eq!(AggregationFrequency::TenSeconds, config.agg_freq());
        assert_eq!(TagPrecedence::CallSiteWins, config.tag_precedence());
        assert!(config.is_persistent());
        assert!(!config.is_mock());
        assert!(config.tags().custom.is_empty());
    }

    #[test]
    fn test_client_config_setters() {
        let config = ClientConfig::new("app")
            .with_target("metrics.example.com", 9999)
            .with_environment("production")
            .with_platform("linux")
            .with_app("checkout")
            .with_tag("region", "eu-west-1")
            .with_persistent(false)
            .with_mock(true);

        assert_eq!("app", config.prefix());
        assert_eq!("metrics.example.com", config.host());
        assert_eq!(9999, config.port());
        assert_eq!("production", config.tags().environment);
        assert_eq!("linux", config.tags().platform);
        assert_eq!("checkout", config.tags().app);
        assert_eq!(Some("eu-west-1"), config.tags().custom.get("region"));
        assert!(!config.is_persistent());
        assert!(config.is_mock());
    }
}
