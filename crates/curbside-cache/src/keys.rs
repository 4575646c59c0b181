//! Cache key construction and TTL presets.
//!
//! Keys are `entity:part:part`. Keeping the entity as a prefix makes
//! `delete_pattern("entity:")` the way to invalidate everything cached for
//! one entity type.

use std::fmt;
use std::time::Duration;

/// Common TTLs for portal data.
pub mod ttl {
    use std::time::Duration;

    /// Fast-changing data (request status, payment status).
    pub const SHORT: Duration = Duration::from_secs(60);
    /// Default for most listings.
    pub const MEDIUM: Duration = Duration::from_secs(5 * 60);
    /// Slow-changing data (announcements, zones).
    pub const LONG: Duration = Duration::from_secs(15 * 60);
    /// Reference data.
    pub const HOUR: Duration = Duration::from_secs(60 * 60);
}

/// Separator between key segments.
pub const SEPARATOR: char = ':';

/// Builder for namespaced cache keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    entity: String,
    parts: Vec<String>,
}

impl CacheKey {
    /// Start a key for an entity type, e.g. `"schedules"`.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            parts: Vec::new(),
        }
    }

    /// Append a segment.
    pub fn part(mut self, part: impl fmt::Display) -> Self {
        self.parts.push(part.to_string());
        self
    }

    /// Pattern matching every key of this entity type.
    pub fn entity_pattern(&self) -> String {
        format!("{}{}", self.entity, SEPARATOR)
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.entity)?;
        for part in &self.parts {
            write!(f, "{}{}", SEPARATOR, part)?;
        }
        Ok(())
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}

/// Pick a preset TTL by name (`short`, `medium`, `long`, `hour`).
pub fn ttl_by_name(name: &str) -> Option<Duration> {
    match name.to_ascii_lowercase().as_str() {
        "short" => Some(ttl::SHORT),
        "medium" => Some(ttl::MEDIUM),
        "long" => Some(ttl::LONG),
        "hour" => Some(ttl::HOUR),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_rendering() {
        let key = CacheKey::new("schedules").part("north").part(2024);
        assert_eq!(key.to_string(), "schedules:north:2024");
        assert_eq!(key.entity_pattern(), "schedules:");
        assert_eq!(CacheKey::new("zones").to_string(), "zones");
    }

    #[test]
    fn test_ttl_by_name() {
        assert_eq!(ttl_by_name("Short"), Some(ttl::SHORT));
        assert_eq!(ttl_by_name("hour"), Some(Duration::from_secs(3600)));
        assert_eq!(ttl_by_name("forever"), None);
    }
}
