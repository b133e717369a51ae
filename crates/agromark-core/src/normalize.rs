//! JSON normalization of retrieved context.
//!
//! Retrieved data is handed to the answer prompt as pretty-printed JSON.
//! SQLite integers are 64-bit, so every integer cell is emitted as a
//! decimal string: a `COUNT(*)` or a summed id never loses precision in
//! the prompt or in any JSON consumer with 53-bit numbers.

use serde_json::{Map, Number, Value};

use crate::models::{SqlResult, SqlRow, SqlValue};

/// Context handed to the answer synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextData {
    /// Rows returned by a generated SQL statement.
    Rows(SqlResult),
    /// Ledger summaries returned by semantic search.
    Documents(Vec<String>),
}

/// Convert one cell. Integers become strings; non-finite reals become `null`.
pub fn value_to_json(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::String(i.to_string()),
        SqlValue::Real(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s.clone()),
        SqlValue::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

/// Convert one row into a JSON object, keeping select-list order.
pub fn row_to_json(row: &SqlRow) -> Value {
    let mut map = Map::with_capacity(row.columns.len());
    for (name, value) in &row.columns {
        map.insert(name.clone(), value_to_json(value));
    }
    Value::Object(map)
}

/// Normalize any context into a JSON value.
pub fn context_to_json(context: &ContextData) -> Value {
    match context {
        ContextData::Rows(rows) => Value::Array(rows.iter().map(row_to_json).collect()),
        ContextData::Documents(docs) => {
            Value::Array(docs.iter().cloned().map(Value::String).collect())
        }
    }
}

/// Pretty-printed JSON for the answer prompt.
pub fn context_to_prompt_json(context: &ContextData) -> String {
    let value = context_to_json(context);
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_large_count_survives_as_string() {
        let mut row = SqlRow::new();
        row.push("COUNT(*)", SqlValue::Integer(9_007_199_254_740_993));
        let json = context_to_json(&ContextData::Rows(vec![row]));
        assert_eq!(json, json!([{ "COUNT(*)": "9007199254740993" }]));

        let text = context_to_prompt_json(&ContextData::Rows(vec![]));
        assert_eq!(text, "[]");
    }

    #[test]
    fn test_small_integer_is_also_string() {
        assert_eq!(value_to_json(&SqlValue::Integer(3)), json!("3"));
    }

    #[test]
    fn test_other_scalars() {
        assert_eq!(value_to_json(&SqlValue::Null), Value::Null);
        assert_eq!(value_to_json(&SqlValue::Real(1520.5)), json!(1520.5));
        assert_eq!(value_to_json(&SqlValue::Real(f64::NAN)), Value::Null);
        assert_eq!(value_to_json(&SqlValue::Text("ABERTA".into())), json!("ABERTA"));
        assert_eq!(value_to_json(&SqlValue::Blob(vec![1, 255])), json!([1, 255]));
    }

    #[test]
    fn test_column_order_is_preserved() {
        let mut row = SqlRow::new();
        row.push("z", SqlValue::Integer(1));
        row.push("a", SqlValue::Integer(2));
        let text = row_to_json(&row).to_string();
        assert_eq!(text, r#"{"z":"1","a":"2"}"#);
    }

    #[test]
    fn test_documents_are_strings() {
        let ctx = ContextData::Documents(vec!["Nota fiscal número 1".into()]);
        assert_eq!(context_to_json(&ctx), json!(["Nota fiscal número 1"]));
    }
}
