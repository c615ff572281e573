//! Per-page registry of bound media.
//!
//! Indices are 1-based and assigned in binding order. The registry never
//! removes entries; a new page view gets a new registry.

use serde::Serialize;

/// One bound media element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    pub index: usize,
    /// Display source: a data URI or a plain URL.
    pub image_url: String,
    pub post_number: String,
    pub original_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    records: Vec<ImageRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return its index.
    ///
    /// Callers are responsible for not binding the same element twice.
    pub fn bind(
        &mut self, image_url: impl Into<String>, original_url: impl Into<String>, post_number: impl Into<String>,
    ) -> usize {
        let index = self.records.len() + 1;
        self.records.push(ImageRecord {
            index,
            image_url: image_url.into(),
            post_number: post_number.into(),
            original_url: original_url.into(),
        });
        tracing::debug!(index, "bound image");
        index
    }

    /// Record at a 1-based index.
    pub fn get(&self, index: usize) -> Option<&ImageRecord> {
        index.checked_sub(1).and_then(|i| self.records.get(i))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }
}
