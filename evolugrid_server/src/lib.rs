//! Server side of an evolugrid: turn rows into the JSON envelope a grid
//! client expects, or into a CSV export, and serve them over HTTP.

pub mod charset;
pub mod column;
pub mod csv;
pub mod serializer;
pub mod server_http;
pub mod source;

pub use evolugrid_common;

/// Everything needed to define and serve a grid.
pub mod prelude {
    pub use crate::charset::Charset;
    pub use crate::column::{
        Column, ColumnBuilder, Condition, Formatter, HtmlColumn, KeyColumn,
        RowFormatter, RowFormatterColumn, TemplateColumn,
    };
    pub use crate::serializer::{
        CsvDocument, GridResponse, ResultSerializer, SerializerError,
    };
    pub use crate::server_http::{
        serve_grid, GridEndpoint, GridServerHandle, GridServerOptions,
    };
    pub use crate::source::{
        CountSource, Paginatable, RowSource, Sortable, SourceError, VecSource,
    };
    pub use evolugrid_common::filter::Filter;
    pub use evolugrid_common::query::{GridQuery, SortOrder};
}
