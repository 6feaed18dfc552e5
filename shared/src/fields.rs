//! ISO 8583 field container
//!
//! The wire protocol addresses fields by number while the simulator's JSON
//! transport addresses them by string key. Fields are stored once, keyed by
//! number; the string-keyed view is projected on demand and at serde
//! boundaries. Keys that are not numbers live in a side table that only the
//! string view exposes.

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Message fields addressable by ISO field number or by string key
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldSet {
    iso: BTreeMap<u16, String>,
    extras: BTreeMap<String, String>,
}

fn iso_number(key: &str) -> Option<u16> {
    key.trim().parse::<u16>().ok()
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field by ISO number
    pub fn set_iso_field(&mut self, number: u16, value: impl Into<String>) {
        self.iso.insert(number, value.into());
    }

    /// Set a field by string key; numeric keys address the ISO field
    pub fn set_field(&mut self, key: &str, value: impl Into<String>) {
        match iso_number(key) {
            Some(number) => {
                self.iso.insert(number, value.into());
            }
            None => {
                self.extras.insert(key.to_string(), value.into());
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match iso_number(key) {
            Some(number) => self.get_iso(number),
            None => self.extras.get(key).map(String::as_str),
        }
    }

    pub fn get_iso(&self, number: u16) -> Option<&str> {
        self.iso.get(&number).map(String::as_str)
    }

    pub fn has_iso(&self, number: u16) -> bool {
        self.iso.contains_key(&number)
    }

    /// Numeric value of a field, if present and parseable
    pub fn get_as_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|value| value.trim().parse().ok())
    }

    /// Numeric-keyed view
    pub fn iso_view(&self) -> &BTreeMap<u16, String> {
        &self.iso
    }

    /// String-keyed view, derived from the canonical store
    pub fn string_view(&self) -> BTreeMap<String, String> {
        self.iso
            .iter()
            .map(|(number, value)| (number.to_string(), value.clone()))
            .chain(self.extras.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.iso.len() + self.extras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iso.is_empty() && self.extras.is_empty()
    }
}

impl Serialize for FieldSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (number, value) in &self.iso {
            map.serialize_entry(&number.to_string(), value)?;
        }
        for (key, value) in &self.extras {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<BTreeMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
        let mut fields = FieldSet::new();

        for (key, value) in raw.unwrap_or_default() {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(text) => fields.set_field(&key, text),
                other => fields.set_field(&key, other.to_string()),
            }
        }

        Ok(fields)
    }
}
