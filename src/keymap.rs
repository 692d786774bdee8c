use crate::keys::{ModifierState, PhysicalKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What one key produces under one modifier chord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum KeyValue {
    Literal(String),
    /// Starts a diacritic composition. `accent` is the spacing form of the
    /// diacritic when the OS reports one.
    Dead { accent: Option<String> },
    Unassigned,
}

impl KeyValue {
    pub fn literal(s: impl Into<String>) -> Self {
        KeyValue::Literal(s.into())
    }

    pub fn is_unassigned(&self) -> bool {
        matches!(self, KeyValue::Unassigned)
    }

    pub fn is_dead(&self) -> bool {
        matches!(self, KeyValue::Dead { .. })
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            KeyValue::Literal(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyMapEntry {
    pub code: PhysicalKey,
    /// Platform virtual-key code: the layout-resolved `VK_*` on Windows, the
    /// `kVK_*` code on macOS. X11 has none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vkey: Option<u32>,
    #[serde(flatten)]
    values: BTreeMap<ModifierState, KeyValue>,
}

impl KeyMapEntry {
    /// An entry with only the mandatory `none` cell, unassigned.
    pub fn unassigned(code: PhysicalKey) -> Self {
        let mut values = BTreeMap::new();
        values.insert(ModifierState::None, KeyValue::Unassigned);
        Self {
            code,
            vkey: None,
            values,
        }
    }

    pub(crate) fn set(&mut self, modifiers: ModifierState, value: KeyValue) {
        self.values.insert(modifiers, value);
    }

    pub fn value(&self, modifiers: ModifierState) -> Option<&KeyValue> {
        self.values.get(&modifiers)
    }

    /// The unmodified value. Always present.
    pub fn base(&self) -> &KeyValue {
        self.values
            .get(&ModifierState::None)
            .unwrap_or(&KeyValue::Unassigned)
    }

    pub fn values(&self) -> impl Iterator<Item = (ModifierState, &KeyValue)> {
        self.values.iter().map(|(m, v)| (*m, v))
    }

    pub fn is_unassigned(&self) -> bool {
        self.values.values().all(KeyValue::is_unassigned)
    }
}

/// One entry per [`PhysicalKey`], in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeyMap {
    entries: Vec<KeyMapEntry>,
}

impl KeyMap {
    /// The fixed-shape map returned when nothing could be read.
    pub fn empty() -> Self {
        Self {
            entries: PhysicalKey::canonical_order()
                .map(KeyMapEntry::unassigned)
                .collect(),
        }
    }

    pub(crate) fn from_entries(entries: Vec<KeyMapEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when no key produces anything, i.e. the map carries no data.
    pub fn is_empty_sentinel(&self) -> bool {
        self.entries.iter().all(KeyMapEntry::is_unassigned)
    }

    pub fn get(&self, key: PhysicalKey) -> Option<&KeyMapEntry> {
        self.entries.get(key.index()).filter(|e| e.code == key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyMapEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[KeyMapEntry] {
        &self.entries
    }
}

impl<'a> IntoIterator for &'a KeyMap {
    type Item = &'a KeyMapEntry;
    type IntoIter = std::slice::Iter<'a, KeyMapEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardLayoutInfo {
    pub id: String,
    pub display_name: String,
}

impl KeyboardLayoutInfo {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// `displayName` of the layout, or `""` when unknown.
pub fn layout_name(layout: Option<&KeyboardLayoutInfo>) -> String {
    layout.map(|l| l.display_name.clone()).unwrap_or_default()
}
