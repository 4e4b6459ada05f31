// src/body/patch.rs

use serde_json::Value;

use crate::core::normalize_key;

/// Label → value updates for one write, kept in insertion order.
/// Inserting an existing label replaces its value in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultsPatch {
    entries: Vec<(String, String)>,
}

impl ResultsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == label) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == label).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Build from a JSON object, stringifying scalar values.
    /// Returns `None` for anything that is not an object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        Some(map.iter().map(|(k, v)| (k.clone(), value_text(v))).collect())
    }

    /// Parse `label=value` pairs as typed on a command line.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut patch = Self::new();
        for pair in pairs {
            let (label, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("Expected LABEL=VALUE, got '{pair}'"))?;
            if label.trim().is_empty() {
                return Err(format!("Empty label in '{pair}'"));
            }
            patch.insert(label.trim(), value.trim());
        }
        Ok(patch)
    }

    /// Index and value of the entry that targets a row labeled `label`.
    ///
    /// Preference: exact label, then trimmed case-insensitive label, then
    /// normalized key.
    pub fn lookup(&self, label: &str) -> Option<(usize, &str)> {
        let hit = |ix: usize| (ix, self.entries[ix].1.as_str());

        if let Some(ix) = self.entries.iter().position(|(k, _)| k == label) {
            return Some(hit(ix));
        }

        let folded = label.trim().to_lowercase();
        if let Some(ix) = self.entries.iter().position(|(k, _)| k.trim().to_lowercase() == folded) {
            return Some(hit(ix));
        }

        let key = normalize_key(label);
        if key.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .position(|(k, _)| normalize_key(k) == key)
            .map(hit)
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => s!(),
        other => other.to_string(),
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ResultsPatch {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut patch = Self::new();
        for (k, v) in iter {
            patch.insert(k, v);
        }
        patch
    }
}
