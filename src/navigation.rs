//! Navigation index - pre-flattened lookup from collection path to its
//! configured node.
//!
//! The config's navigation tree is walked exactly once at load time; every
//! per-view lookup afterwards is a map access instead of a recursive search.

use std::collections::BTreeMap;

use crate::config::{CollectionConfig, FieldOverrides, FormOverrides, NavItem};

/// One flattened navigation entry bound to a collection path.
#[derive(Debug, Clone)]
pub struct NavEntry {
    pub label: String,
    pub icon: Option<String>,
    pub collection: CollectionConfig,
}

/// Flattened navigation tree: collection path → entry.
///
/// Built once per loaded configuration; duplicate bindings keep the first
/// occurrence, matching the tree's top-to-bottom reading order.
#[derive(Debug, Clone, Default)]
pub struct NavIndex {
    entries: Vec<NavEntry>,
    by_path: BTreeMap<String, usize>,
}

impl NavIndex {
    pub fn build(items: &[NavItem]) -> Self {
        let mut index = NavIndex::default();
        index.collect(items);
        index
    }

    fn collect(&mut self, items: &[NavItem]) {
        for item in items {
            if let Some(collection) = &item.collection {
                if !self.by_path.contains_key(&collection.path) {
                    self.by_path
                        .insert(collection.path.clone(), self.entries.len());
                    self.entries.push(NavEntry {
                        label: item.label.clone(),
                        icon: item.icon.clone(),
                        collection: collection.clone(),
                    });
                }
            }
            self.collect(&item.children);
        }
    }

    pub fn get(&self, collection_path: &str) -> Option<&NavEntry> {
        self.by_path
            .get(collection_path)
            .map(|&idx| &self.entries[idx])
    }

    /// All bound entries, in tree reading order.
    pub fn entries(&self) -> &[NavEntry] {
        &self.entries
    }

    pub fn display_fields(&self, collection_path: &str) -> Option<&[String]> {
        self.get(collection_path)?
            .collection
            .display_fields
            .as_deref()
    }

    pub fn list_overrides(&self, collection_path: &str) -> Option<&FieldOverrides> {
        self.get(collection_path)?.collection.list_overrides.as_ref()
    }

    pub fn form_overrides(&self, collection_path: &str) -> Option<&FormOverrides> {
        self.get(collection_path)?.collection.form_overrides.as_ref()
    }

    /// Field overrides for the form view, nested under `form_overrides`.
    pub fn form_field_overrides(&self, collection_path: &str) -> Option<&FieldOverrides> {
        self.form_overrides(collection_path)?.field_overrides.as_ref()
    }
}
