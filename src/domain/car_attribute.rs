use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identifier of the attribute synthesized from the listing URL.
pub const AD_ID_FIELD: &str = "ads_id";

/// Label carried by the synthesized ad id attribute.
pub const AD_ID_LABEL: &str = "id ads";

/// One extracted fact about a car.
///
/// Upstream payloads are loosely typed: any field may be missing, `null`, or
/// a number instead of a string. Missing fields decode to an empty string and
/// scalars decode to their textual form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttribute {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(rename = "realValue", default, deserialize_with = "lenient_string")]
    pub real_value: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: String,
}

impl RawAttribute {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    /// The ad identifier attribute appended to every detail page's attributes.
    pub fn ad_id(ad_id: &str) -> Self {
        Self {
            id: AD_ID_FIELD.to_string(),
            value: ad_id.to_string(),
            real_value: String::new(),
            label: AD_ID_LABEL.to_string(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Decode one attribute from a JSON value. Non-object values yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

/// Render any JSON scalar as text; `null` and containers become empty.
pub fn json_scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(json_scalar_to_string(&value))
}
