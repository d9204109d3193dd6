//! Response-shape normalization.
//!
//! The platform's list endpoints answer `{"items": [...], "total": n}`,
//! but the dashboards also talk to older deployments that return
//! `{"data": [...]}` or a bare array. Instead of sprinkling
//! `res.items || res.data || res` at every call site, this is the one
//! place a response body is unwrapped into typed values.

use crate::error::ClientError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Unwrap a list-shaped body: `{"items": [...]}`, `{"data": [...]}` or
/// a bare array.
pub fn unwrap_list<T: DeserializeOwned>(body: Value) -> Result<Vec<T>, ClientError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items").or_else(|| map.remove("data")) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ClientError::Shape(format!(
                    "expected an array under items/data, got {other}"
                )))
            }
            None => {
                return Err(ClientError::Shape(
                    "object response carries neither items nor data".to_string(),
                ))
            }
        },
        other => {
            return Err(ClientError::Shape(format!(
                "expected a list-shaped response, got {other}"
            )))
        }
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).map_err(|e| ClientError::Shape(e.to_string()))
        })
        .collect()
}

/// Unwrap an object-shaped body: `{"data": {...}}`, `{"theme": {...}}`
/// or the object itself.
pub fn unwrap_object<T: DeserializeOwned>(body: Value) -> Result<T, ClientError> {
    let object = match body {
        Value::Object(mut map) => {
            let wrapped = map
                .remove("data")
                .or_else(|| map.remove("theme"))
                .filter(|v| v.is_object());
            match wrapped {
                Some(inner) => inner,
                None => Value::Object(map),
            }
        }
        other => other,
    };
    serde_json::from_value(object).map_err(|e| ClientError::Shape(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct Row {
        name: String,
    }

    #[test]
    fn unwraps_items_envelope() {
        let body = json!({ "items": [{"name": "a"}, {"name": "b"}], "total": 2 });
        let rows: Vec<Row> = unwrap_list(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "a");
    }

    #[test]
    fn unwraps_data_envelope() {
        let body = json!({ "data": [{"name": "a"}] });
        let rows: Vec<Row> = unwrap_list(body).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn unwraps_bare_array() {
        let body = json!([{"name": "a"}]);
        let rows: Vec<Row> = unwrap_list(body).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn rejects_shapeless_bodies() {
        assert!(unwrap_list::<Row>(json!({ "count": 3 })).is_err());
        assert!(unwrap_list::<Row>(json!("nope")).is_err());
    }

    #[test]
    fn unwraps_wrapped_and_bare_objects() {
        let row: Row = unwrap_object(json!({ "data": {"name": "a"} })).unwrap();
        assert_eq!(row.name, "a");
        let row: Row = unwrap_object(json!({ "theme": {"name": "b"} })).unwrap();
        assert_eq!(row.name, "b");
        let row: Row = unwrap_object(json!({"name": "c"})).unwrap();
        assert_eq!(row.name, "c");
    }
}
