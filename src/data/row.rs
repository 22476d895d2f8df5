//! Row access abstraction
//!
//! The engine never assumes a concrete row schema. Rows are read only
//! through column keys and an id accessor, which lets callers plug in
//! JSON records from a REST backend or their own structs.

use crate::data::value::DataValue;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

/// Field key used for row identity when the caller does not supply one
pub const DEFAULT_ID_KEY: &str = "id";

/// Read-only access to a row's fields by column key
pub trait Row: Send + Sync {
    /// Value stored under `key`; missing fields are `DataValue::Null`
    fn value(&self, key: &str) -> DataValue;

    /// Identifier used for selection. Defaults to the `id` field.
    fn row_id(&self) -> Option<String> {
        match self.value(DEFAULT_ID_KEY) {
            DataValue::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl Row for Map<String, JsonValue> {
    fn value(&self, key: &str) -> DataValue {
        self.get(key).map(DataValue::from).unwrap_or(DataValue::Null)
    }
}

impl Row for JsonValue {
    fn value(&self, key: &str) -> DataValue {
        self.as_object()
            .and_then(|obj| obj.get(key))
            .map(DataValue::from)
            .unwrap_or(DataValue::Null)
    }
}

impl Row for HashMap<String, DataValue> {
    fn value(&self, key: &str) -> DataValue {
        self.get(key).cloned().unwrap_or(DataValue::Null)
    }
}
