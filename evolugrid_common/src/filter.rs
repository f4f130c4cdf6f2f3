//! Filters are the name/value pairs sent along with every grid fetch.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// A single filter, as produced by a filter form, a callback or a static
/// list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub value: String,
}

impl Filter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl<N: Into<String>, V: Into<String>> From<(N, V)> for Filter {
    fn from((name, value): (N, V)) -> Self {
        Self::new(name, value)
    }
}

/// Encode a list of filters as an `application/x-www-form-urlencoded`
/// query string, preserving order and duplicates.
pub fn encode_filters(filters: &[Filter]) -> String {
    let mut ser = form_urlencoded::Serializer::new(String::new());
    for f in filters {
        ser.append_pair(&f.name, &f.value);
    }
    ser.finish()
}

/// Decode a query string into a list of filters.
///
/// A leading `?` is tolerated.
pub fn decode_filters(query: &str) -> Vec<Filter> {
    let query = query.strip_prefix('?').unwrap_or(query);

    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| Filter::new(k, v))
        .collect()
}

/// Find the first value bound to a filter name.
pub fn find_filter<'a>(filters: &'a [Filter], name: &str) -> Option<&'a str> {
    filters
        .iter()
        .find(|f| f.name == name)
        .map(|f| f.value.as_str())
}
