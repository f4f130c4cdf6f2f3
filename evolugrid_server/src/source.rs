//! Row sources feed rows to a [crate::serializer::ResultSerializer].
//!
//! A source may optionally be able to page or sort itself. These
//! capabilities are discovered through [RowSource::as_paginatable] and
//! [RowSource::as_sortable]; a source that does not expose them is serialized
//! as-is.

use std::cmp::Ordering;

use evolugrid_common::filter::Filter;
use evolugrid_common::value_tools::{lookup_path, scalar_text};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Unable to convert rows: {0}")]
    Convert(#[from] serde_json::Error),

    #[error("Row source failure: {0}")]
    Backend(String),
}

/// Anything that yields rows.
pub trait RowSource: Send {
    /// Rows of the current scope, after any pagination or sort applied
    /// through the capabilities below.
    fn rows(&mut self) -> Result<Vec<Value>, SourceError>;

    /// Total number of rows ignoring pagination, if the source knows it.
    fn total_count(&mut self) -> Option<u64> {
        None
    }

    fn as_paginatable(&mut self) -> Option<&mut dyn Paginatable> {
        None
    }

    fn as_sortable(&mut self) -> Option<&mut dyn Sortable> {
        None
    }
}

/// A source that can restrict itself to a window of rows.
pub trait Paginatable {
    fn paginate(&mut self, limit: u64, offset: u64);
}

/// A source that can order its rows.
///
/// Key and order are passed through as received; a source is free to
/// ignore values it does not understand.
pub trait Sortable {
    fn sort(&mut self, key: &str, order: Option<&str>);
}

/// Supplies the total row count, independent of the row source.
pub trait CountSource: Send {
    fn count(&mut self) -> Option<u64>;
}

impl CountSource for u64 {
    fn count(&mut self) -> Option<u64> {
        Some(*self)
    }
}

impl<F> CountSource for F
where
    F: FnMut() -> Option<u64> + Send,
{
    fn count(&mut self) -> Option<u64> {
        (self)()
    }
}

/// A plain list of rows: no pagination, no sort.
impl RowSource for Vec<Value> {
    fn rows(&mut self) -> Result<Vec<Value>, SourceError> {
        Ok(self.clone())
    }
}

// =============================================================================

/// An in-memory row source that supports pagination, sort, count and
/// simple filters.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    rows: Vec<Value>,
    filters: Vec<Filter>,
    window: Option<(u64, u64)>,
    sort: Option<(String, bool)>,
}

impl VecSource {
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    /// Build from any serializable records.
    pub fn from_serialize<T: Serialize>(
        records: &[T],
    ) -> Result<Self, SourceError> {
        let rows = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rows))
    }

    /// Keep only rows whose field contains the filter value,
    /// case-insensitively.
    ///
    /// Filters naming a field that no row has are ignored, as are filters
    /// with an empty value.
    pub fn with_filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = filters;
        self
    }

    fn applicable_filters(&self) -> Vec<&Filter> {
        self.filters
            .iter()
            .filter(|f| !f.value.is_empty())
            .filter(|f| self.rows.iter().any(|r| lookup_path(r, &f.name).is_some()))
            .collect()
    }

    fn filtered(&self) -> Vec<&Value> {
        let filters = self.applicable_filters();

        self.rows
            .iter()
            .filter(|row| {
                filters.iter().all(|f| {
                    let cell = lookup_path(row, &f.name)
                        .map(scalar_text)
                        .unwrap_or_default();
                    cell.to_lowercase().contains(&f.value.to_lowercase())
                })
            })
            .collect()
    }
}

/// Order JSON values: nulls first, then booleans, numbers, and strings.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x @ Value::Array(_)), Some(y @ Value::Array(_)))
        | (Some(x @ Value::Object(_)), Some(y @ Value::Object(_))) => {
            x.to_string().cmp(&y.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

impl RowSource for VecSource {
    fn rows(&mut self) -> Result<Vec<Value>, SourceError> {
        let mut rows = self.filtered();

        if let Some((key, descending)) = &self.sort {
            rows.sort_by(|a, b| {
                let ord = compare_values(lookup_path(a, key), lookup_path(b, key));
                if *descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        let rows = rows.into_iter().cloned();

        Ok(match self.window {
            Some((limit, offset)) => rows
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
            None => rows.collect(),
        })
    }

    fn total_count(&mut self) -> Option<u64> {
        Some(self.filtered().len() as u64)
    }

    fn as_paginatable(&mut self) -> Option<&mut dyn Paginatable> {
        Some(self)
    }

    fn as_sortable(&mut self) -> Option<&mut dyn Sortable> {
        Some(self)
    }
}

impl Paginatable for VecSource {
    fn paginate(&mut self, limit: u64, offset: u64) {
        self.window = Some((limit, offset));
    }
}

impl Sortable for VecSource {
    fn sort(&mut self, key: &str, order: Option<&str>) {
        if key.is_empty() {
            return;
        }
        let descending = order
            .map(|o| o.eq_ignore_ascii_case("desc"))
            .unwrap_or(false);

        log::debug!("Sorting in-memory rows on {key}, descending: {descending}");
        self.sort = Some((key.to_string(), descending));
    }
}
