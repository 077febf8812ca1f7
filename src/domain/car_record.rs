//! Normalized output record and the known-field schema.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// Recognized attribute identifiers, in output column order.
pub const KNOWN_FIELDS: &[&str] = &[
    "price",
    "location",
    "condition",
    "make",
    "model",
    "car_type",
    "transmission",
    "engine_capacity",
    "mileage",
    "manufactured_date",
    "ads_id",
    "family",
    "variant",
    "series",
    "style",
    "seat",
    "country_origin",
    "cc",
    "comp_ratio",
    "kw",
    "torque",
    "engine",
    "fuel_type",
    "length",
    "width",
    "height",
    "wheelbase",
    "kerbwt",
    "fueltk",
    "brake_front",
    "brake_rear",
    "suspension_front",
    "suspension_rear",
    "steering",
    "tyres_front",
    "tyres_rear",
    "wheel_rim_front",
    "wheel_rim_rear",
];

/// Returns the schema's own `'static` name for `id`, if it is a known field.
pub fn known_field(id: &str) -> Option<&'static str> {
    KNOWN_FIELDS.iter().copied().find(|field| *field == id)
}

pub fn is_known_field(id: &str) -> bool {
    known_field(id).is_some()
}

/// Flat mapping from known field name to value.
///
/// Keys can only be inserted through [`NormalizedCarRecord::set`], which
/// rejects anything outside [`KNOWN_FIELDS`]. Missing fields stay absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedCarRecord {
    fields: HashMap<&'static str, String>,
}

impl NormalizedCarRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `id` to `value`, replacing any earlier value. Returns `false` and
    /// leaves the record untouched when `id` is not a known field.
    pub fn set(&mut self, id: &str, value: impl Into<String>) -> bool {
        match known_field(id) {
            Some(field) => {
                self.fields.insert(field, value.into());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Populated fields in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        KNOWN_FIELDS
            .iter()
            .filter_map(|field| self.fields.get(field).map(|value| (*field, value.as_str())))
    }
}

impl Serialize for NormalizedCarRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

/// Union of the fields populated across `records`, in schema order.
pub fn populated_columns(records: &[NormalizedCarRecord]) -> Vec<&'static str> {
    KNOWN_FIELDS
        .iter()
        .copied()
        .filter(|field| records.iter().any(|record| record.contains(field)))
        .collect()
}
