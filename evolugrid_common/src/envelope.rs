//! The JSON envelope a grid endpoint answers with.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of the payload, keyed by positional column keys (`col0`, `col1`...).
pub type RowData = serde_json::Map<String, Value>;

/// Build the positional payload key for a column index.
pub fn column_key(index: usize) -> String {
    format!("col{index}")
}

fn default_true() -> bool {
    true
}

/// How the client should render a column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub title: String,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub sort_key: Option<String>,
    #[serde(default)]
    pub css_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    /// The payload key holding this column's cell value.
    #[serde(default)]
    pub display: String,
    #[serde(rename = "escapeHTML", default = "default_true")]
    pub escape_html: bool,
    /// A `{field}` template, interpolated against the row on the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsdisplay: Option<String>,
}

impl ColumnDescriptor {
    /// Key to send when the user sorts on this column: the dedicated sort
    /// key if there is one, the display key otherwise.
    pub fn effective_sort_key(&self) -> &str {
        match &self.sort_key {
            Some(k) if !k.is_empty() => k,
            _ => &self.display,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
}

/// A page of results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Total number of rows across all pages. `None` means unknown.
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub data: Vec<RowData>,
    #[serde(default)]
    pub descriptor: Descriptor,
    /// Opaque payload echoed to the client for out-of-band hooks.
    #[serde(rename = "additionnalData", default)]
    pub additional_data: Value,
}

impl ResponseEnvelope {
    pub fn row_count(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_wire_shape() {
        let mut row = RowData::new();
        row.insert(column_key(0), json!(1));

        let env = ResponseEnvelope {
            count: None,
            data: vec![row],
            descriptor: Descriptor {
                columns: vec![ColumnDescriptor {
                    title: "Id".into(),
                    sortable: true,
                    sort_key: Some("id".into()),
                    display: column_key(0),
                    escape_html: true,
                    ..Default::default()
                }],
            },
            additional_data: Value::Null,
        };

        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({
                "count": null,
                "data": [{"col0": 1}],
                "descriptor": {"columns": [{
                    "title": "Id",
                    "sortable": true,
                    "sortKey": "id",
                    "cssClass": null,
                    "display": "col0",
                    "escapeHTML": true
                }]},
                "additionnalData": null
            })
        );
    }

    #[test]
    fn sparse_envelope_decodes_with_defaults() {
        let env: ResponseEnvelope = serde_json::from_value(json!({
            "data": [],
            "descriptor": {"columns": [{"title": "A", "display": "col0"}]}
        }))
        .unwrap();

        assert_eq!(env.count, None);
        assert!(env.descriptor.columns[0].escape_html);
        assert_eq!(env.descriptor.columns[0].effective_sort_key(), "col0");
    }
}
