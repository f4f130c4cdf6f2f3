//! Query parameters understood by a grid endpoint

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WireError;
use crate::filter::{decode_filters, Filter};

/// Reserved parameter names. Everything else in a request is a filter.
pub mod strings {
    pub const OFFSET: &str = "offset";
    pub const LIMIT: &str = "limit";
    pub const SORT_KEY: &str = "sort_key";
    pub const SORT_ORDER: &str = "sort_order";
    pub const OUTPUT: &str = "output";
    /// Cache-busting parameter appended by the client transport.
    pub const CACHE_BUSTER: &str = "_";

    pub const ALL: [&str; 6] =
        [OFFSET, LIMIT, SORT_KEY, SORT_ORDER, OUTPUT, CACHE_BUSTER];
}

/// Direction of a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(WireError::InvalidParameter {
                name: strings::SORT_ORDER.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// The format a serializer should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(WireError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// A decoded grid request.
///
/// Sort key and order are carried as raw strings: interpreting them is the
/// business of the row source, not of the wire layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridQuery {
    pub filters: Vec<Filter>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub sort_key: Option<String>,
    pub sort_order: Option<String>,
    pub output: Option<String>,
}

fn parse_count(name: &str, value: &str) -> Result<u64, WireError> {
    value.parse().map_err(|_| WireError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl GridQuery {
    /// Split a list of request parameters into reserved values and filters.
    ///
    /// Empty reserved values are treated as absent.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, WireError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut ret = GridQuery::default();

        for (k, v) in pairs {
            let (k, v): (String, String) = (k.into(), v.into());

            match k.as_str() {
                strings::OFFSET => {
                    if !v.is_empty() {
                        ret.offset = Some(parse_count(&k, &v)?);
                    }
                }
                strings::LIMIT => {
                    if !v.is_empty() {
                        ret.limit = Some(parse_count(&k, &v)?);
                    }
                }
                strings::SORT_KEY => ret.sort_key = non_empty(v),
                strings::SORT_ORDER => ret.sort_order = non_empty(v),
                strings::OUTPUT => ret.output = non_empty(v),
                strings::CACHE_BUSTER => {}
                _ => ret.filters.push(Filter::new(k, v)),
            }
        }

        Ok(ret)
    }

    /// Decode a raw query string (with or without the leading `?`).
    pub fn from_query_str(query: &str) -> Result<Self, WireError> {
        Self::from_pairs(
            decode_filters(query).into_iter().map(|f| (f.name, f.value)),
        )
    }

    /// Parse the requested output format, if any.
    pub fn output_format(&self) -> Result<Option<OutputFormat>, WireError> {
        self.output.as_deref().map(str::parse).transpose()
    }

    /// Flatten back into request parameters: filters first, then the
    /// reserved values that are set.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut ret: Vec<(String, String)> = self
            .filters
            .iter()
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect();

        if let Some(o) = self.offset {
            ret.push((strings::OFFSET.into(), o.to_string()));
        }
        if let Some(l) = self.limit {
            ret.push((strings::LIMIT.into(), l.to_string()));
        }
        if let Some(k) = &self.sort_key {
            ret.push((strings::SORT_KEY.into(), k.clone()));
        }
        if let Some(o) = &self.sort_order {
            ret.push((strings::SORT_ORDER.into(), o.clone()));
        }
        if let Some(o) = &self.output {
            ret.push((strings::OUTPUT.into(), o.clone()));
        }

        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_parameters_are_split_from_filters() {
        let q = GridQuery::from_query_str(
            "?name=bob&offset=20&limit=10&sort_key=age&sort_order=desc&_=1234",
        )
        .unwrap();

        assert_eq!(q.filters, vec![Filter::new("name", "bob")]);
        assert_eq!(q.offset, Some(20));
        assert_eq!(q.limit, Some(10));
        assert_eq!(q.sort_key.as_deref(), Some("age"));
        assert_eq!(q.sort_order.as_deref(), Some("desc"));
        assert_eq!(q.output_format().unwrap(), None);
    }

    #[test]
    fn empty_reserved_values_are_absent() {
        let q = GridQuery::from_query_str("limit=&sort_key=&output=").unwrap();

        assert_eq!(q, GridQuery::default());
    }

    #[test]
    fn bad_offset_is_rejected() {
        let err = GridQuery::from_query_str("offset=ten").unwrap_err();

        assert!(matches!(
            err,
            WireError::InvalidParameter { ref name, .. } if name == "offset"
        ));
    }

    #[test]
    fn unknown_output_format_names_the_format() {
        let q = GridQuery::from_query_str("output=xlsx").unwrap();

        match q.output_format() {
            Err(WireError::UnsupportedFormat(f)) => assert_eq!(f, "xlsx"),
            other => panic!("Unexpected result: {other:?}"),
        }
    }

    #[test]
    fn malformed_sort_order_passes_through() {
        let q = GridQuery::from_query_str("sort_key=a&sort_order=sideways")
            .unwrap();

        assert_eq!(q.sort_order.as_deref(), Some("sideways"));
        assert!("sideways".parse::<SortOrder>().is_err());
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
    }
}
