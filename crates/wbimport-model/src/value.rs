//! Typed data values carried by snaks.

use crate::id::EntityId;
use serde::{Deserialize, Serialize};

/// Unit string for quantities without a unit.
pub const UNITLESS: &str = "1";

/// Closed set of value kinds. Kinds the importer never inspects keep their
/// raw JSON in [`DataValue::Other`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "crate::json::RawDataValue", into = "crate::json::RawDataValue")]
pub enum DataValue {
    EntityId(EntityId),
    Quantity(QuantityValue),
    String(String),
    MonolingualText { language: String, text: String },
    Time(TimeValue),
    Other {
        value_type: String,
        value: serde_json::Value,
    },
}

impl DataValue {
    pub fn value_type(&self) -> &str {
        match self {
            DataValue::EntityId(_) => "wikibase-entityid",
            DataValue::Quantity(_) => "quantity",
            DataValue::String(_) => "string",
            DataValue::MonolingualText { .. } => "monolingualtext",
            DataValue::Time(_) => "time",
            DataValue::Other { value_type, .. } => value_type,
        }
    }

    pub fn as_entity_id(&self) -> Option<&EntityId> {
        match self {
            DataValue::EntityId(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_quantity(&self) -> Option<&QuantityValue> {
        match self {
            DataValue::Quantity(q) => Some(q),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityValue {
    pub amount: String,
    pub unit: String,
    #[serde(rename = "upperBound", default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<String>,
    #[serde(rename = "lowerBound", default, skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<String>,
}

impl QuantityValue {
    /// Quantity without bounds.
    pub fn unbounded(amount: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            unit: unit.into(),
            upper_bound: None,
            lower_bound: None,
        }
    }

    pub fn is_unitless(&self) -> bool {
        self.unit == UNITLESS
    }

    /// Same amount and bounds, different unit.
    pub fn with_unit(&self, unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeValue {
    pub time: String,
    #[serde(default)]
    pub timezone: i32,
    #[serde(default)]
    pub before: u32,
    #[serde(default)]
    pub after: u32,
    pub precision: u8,
    pub calendarmodel: String,
}
