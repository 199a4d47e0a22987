// Statful - A buffered UDP metrics client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::types::{ErrorKind, MetricError, MetricResult};
use indexmap::IndexMap;

const ENVIRONMENT_TAG: &str = "environment";
const PLATFORM_TAG: &str = "platform";
const APP_TAG: &str = "app";

/// Ordered set of key-value tags attached to a metric.
///
/// Keys are unique. Inserting a key that is already present replaces its value
/// but keeps the position it was first inserted at, so the rendered order of
/// tags is stable across merges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: IndexMap<String, String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags.insert(key.into(), value.into());
    }

    /// Merge all tags from `other` into this set, overriding existing keys.
    pub fn merge(&mut self, other: &TagSet) {
        for (k, v) in other.iter() {
            self.insert(k, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Check that every key and value can be written on a metric line.
    ///
    /// Keys must be non-empty. Neither keys nor values may contain a space,
    /// `,`, `=` or a line break, since those delimit the fields of a line.
    pub fn validate(&self) -> MetricResult<()> {
        for (key, value) in self.iter() {
            if key.is_empty() {
                return Err(MetricError::from((ErrorKind::InvalidInput, "Tag key must not be empty")));
            }
            if key.contains(is_delimiter) || value.contains(is_delimiter) {
                return Err(MetricError::from((
                    ErrorKind::InvalidInput,
                    "Tag must not contain spaces, commas, equal signs or line breaks",
                )));
            }
        }
        Ok(())
    }

    // Bytes needed to render every tag as `key=value` with separators
    pub(crate) fn rendered_size(&self) -> usize {
        self.tags.iter().map(|(k, v)| k.len() + v.len() + 2).sum()
    }
}

fn is_delimiter(c: char) -> bool {
    matches!(c, ' ' | ',' | '=' | '\n' | '\r' | '\t')
}

impl<K, V> FromIterator<(K, V)> for TagSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// Tags configured once on a client and applied to every metric it emits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalTags {
    pub environment: String,
    pub platform: String,
    pub app: String,
    pub custom: TagSet,
}

/// Which side wins when a call-site tag and a custom global tag share a key.
///
/// The `environment`, `platform` and `app` tags are defaults and always lose
/// to tags with the same key given at the call site.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum TagPrecedence {
    /// Call-site tags are merged last and override every global tag.
    #[default]
    CallSiteWins,
    /// Custom global tags are merged after call-site tags and override them.
    GlobalTagsWin,
}

/// Compose the final tag set of a metric from the client globals and the tags
/// given at the call site.
pub fn resolve(globals: &GlobalTags, call_tags: &TagSet, precedence: TagPrecedence) -> TagSet {
    let mut resolved = TagSet::new();

    if !globals.environment.is_empty() {
        resolved.insert(ENVIRONMENT_TAG, globals.environment.as_str());
    }
    if !globals.platform.is_empty() {
        resolved.insert(PLATFORM_TAG, globals.platform.as_str());
    }
    if !globals.app.is_empty() {
        resolved.insert(APP_TAG, globals.app.as_str());
    }

    match precedence {
        TagPrecedence::CallSiteWins => {
            resolved.merge(&globals.custom);
            resolved.merge(call_tags);
        }
        TagPrecedence::GlobalTagsWin => {
            resolved.merge(call_tags);
            resolved.merge(&globals.custom);
        }
    }

    resolved
}
