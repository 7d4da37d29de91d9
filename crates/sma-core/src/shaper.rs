// ── Response shaper ──
//
// Maps raw channel readings onto the caller's query: each value is keyed
// by its alias (or channel id), fallbacks stand in for missing values,
// and every irregularity becomes a warning instead of a failure.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use sma_api::ChannelValues;

use crate::query::{ChannelKey, QueryItem};
use crate::response::RESERVED_KEYS;

/// Who already holds an output key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyHolder {
    Channel(ChannelKey),
    Reserved(String),
}

impl fmt::Display for KeyHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(key) => write!(f, "{key}"),
            Self::Reserved(name) => write!(f, "reserved key {name}"),
        }
    }
}

/// A per-item irregularity. The response is still successful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeWarning {
    /// `alias` was taken, so the value of `key` went under `used` instead.
    AliasCollision {
        alias: String,
        key: ChannelKey,
        holder: KeyHolder,
        used: String,
    },
    NotFound { key: ChannelKey },
    NoValue { key: ChannelKey },
    FallbackUsed { key: ChannelKey },
}

impl fmt::Display for ShapeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AliasCollision {
                alias,
                key,
                holder,
                used,
            } => {
                write!(f, "alias {alias} for {key} collides with {holder}, using ")?;
                if *used == key.channel {
                    f.write_str("channel id")
                } else {
                    write!(f, "key {used}")
                }
            }
            Self::NotFound { key } => write!(f, "{key} was not found"),
            Self::NoValue { key } => write!(f, "{key} had no value"),
            Self::FallbackUsed { key } => write!(f, "{key} had no value, using fallback"),
        }
    }
}

/// Shaped values plus the warnings raised while producing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shaped {
    pub values: IndexMap<String, serde_json::Value>,
    pub warnings: Vec<ShapeWarning>,
}

impl Shaped {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Shape `readings` against `query`.
///
/// Values appear in reading order; warnings in encounter order, reading
/// collisions first, then unsatisfied query items in query order.
pub fn shape(query: &[QueryItem], readings: &[ChannelValues], warn_on_fallback: bool) -> Shaped {
    let mut output = Output::default();

    for reading in readings {
        let item = query
            .iter()
            .find(|q| q.matches(&reading.component_id, &reading.channel_id));
        let key = ChannelKey::new(&reading.component_id, &reading.channel_id);

        let value = match (reading.current_value(), item.and_then(|q| q.fallback.as_ref())) {
            (Some(value), _) => value.clone(),
            (None, Some(fallback)) => {
                if warn_on_fallback {
                    output.warnings.push(ShapeWarning::FallbackUsed { key: key.clone() });
                }
                fallback.clone()
            }
            (None, None) => continue,
        };

        let alias = item
            .and_then(|q| q.alias.clone())
            .unwrap_or_else(|| reading.channel_id.clone());
        output.insert(alias, key, value.into());
    }

    for item in query {
        let mut matching = readings
            .iter()
            .filter(|r| item.matches(&r.component_id, &r.channel_id))
            .peekable();

        if matching.peek().is_none() {
            output.warnings.push(ShapeWarning::NotFound { key: item.key() });
        } else if item.fallback.is_none() && matching.all(|r| r.current_value().is_none()) {
            output.warnings.push(ShapeWarning::NoValue { key: item.key() });
        }
    }

    Shaped {
        values: output.values,
        warnings: output.warnings,
    }
}

#[derive(Default)]
struct Output {
    values: IndexMap<String, serde_json::Value>,
    holders: HashMap<String, ChannelKey>,
    warnings: Vec<ShapeWarning>,
}

impl Output {
    fn holder(&self, name: &str) -> Option<KeyHolder> {
        if RESERVED_KEYS.contains(&name) {
            return Some(KeyHolder::Reserved(name.to_owned()));
        }
        self.holders.get(name).cloned().map(KeyHolder::Channel)
    }

    fn insert(&mut self, alias: String, key: ChannelKey, value: serde_json::Value) {
        let slot = match self.holder(&alias) {
            None => alias,
            Some(holder) => {
                let used = if alias != key.channel && self.holder(&key.channel).is_none() {
                    key.channel.clone()
                } else {
                    self.free_key(&key)
                };
                self.warnings.push(ShapeWarning::AliasCollision {
                    alias,
                    key: key.clone(),
                    holder,
                    used: used.clone(),
                });
                used
            }
        };

        self.holders.insert(slot.clone(), key);
        self.values.insert(slot, value);
    }

    /// `component::channel`, or `component::channel#N` with the smallest
    /// free `N >= 2` when an alias already claimed it.
    fn free_key(&self, key: &ChannelKey) -> String {
        let base = key.to_string();
        if self.holder(&base).is_none() {
            return base;
        }
        (2_usize..)
            .map(|n| format!("{base}#{n}"))
            .find(|candidate| self.holder(candidate).is_none())
            .unwrap_or(base)
    }
}
