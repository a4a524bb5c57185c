use std::time::Duration;

/// Key/value cache for serialized store records.
pub trait RecordCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str, ttl: Duration);
}
