/*!
Process-wide parameter table.

Keys are dotted strings (`"<family>.<name>"`). The key set is fixed when the
table is built; only the values change afterwards. Every access is a single
atomic load or store, so a worker never observes a torn value. A value changed
while a session runs takes effect the next time a worker reads it, which is
at the next decode cycle for keys read per frame and at the next start for
keys read at startup.
*/

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;
use tracing::debug;

use crate::protocol::COMMON_DEBUG;

/// A parameter key with its documented default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub key: &'static str,
    pub default: u32,
}

impl ParamSpec {
    pub const fn new(key: &'static str, default: u32) -> Self {
        Self { key, default }
    }
}

/// Mapping from dotted key to an atomically accessed unsigned value
#[derive(Debug)]
pub struct ParameterTable {
    values: BTreeMap<&'static str, AtomicU32>,
}

impl ParameterTable {
    /// Build a table holding `common.debug` plus the given keys at their defaults
    pub fn with_defaults(specs: &[ParamSpec]) -> Self {
        let mut values = BTreeMap::new();
        values.insert(COMMON_DEBUG, AtomicU32::new(0));
        for spec in specs {
            values.insert(spec.key, AtomicU32::new(spec.default));
        }
        Self { values }
    }

    /// Store a value. Unknown keys are ignored; returns whether the key exists.
    pub fn set(&self, key: &str, value: u32) -> bool {
        match self.values.get(key) {
            Some(slot) => {
                slot.store(value, Ordering::Relaxed);
                debug!("set_parameter {} = {}", key, value);
                true
            }
            None => {
                debug!("set_parameter ignored unknown key {}", key);
                false
            }
        }
    }

    /// Load a value, `None` for unknown keys
    pub fn get(&self, key: &str) -> Option<u32> {
        self.values.get(key).map(|slot| slot.load(Ordering::Relaxed))
    }

    /// Load a value, falling back to `default` for unknown keys
    pub fn get_or(&self, key: &str, default: u32) -> u32 {
        self.get(key).unwrap_or(default)
    }

    /// Current value of `common.debug`
    pub fn debug(&self) -> u32 {
        self.get_or(COMMON_DEBUG, 0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Snapshot of every key with its current value, sorted by key
    pub fn snapshot(&self) -> Vec<(&'static str, u32)> {
        self.values
            .iter()
            .map(|(key, slot)| (*key, slot.load(Ordering::Relaxed)))
            .collect()
    }
}
