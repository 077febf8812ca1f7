//! Projection of raw attributes onto the known-field schema.

use crate::domain::{NormalizedCarRecord, RawAttribute};

/// Builds one flat record from an attribute sequence.
///
/// Attributes are applied in order: known ids overwrite earlier values
/// (last write wins), unknown ids are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeNormalizer;

impl AttributeNormalizer {
    pub fn normalize(&self, attributes: &[RawAttribute]) -> NormalizedCarRecord {
        let mut record = NormalizedCarRecord::new();
        for attribute in attributes {
            record.set(&attribute.id, attribute.value.as_str());
        }
        record
    }
}
