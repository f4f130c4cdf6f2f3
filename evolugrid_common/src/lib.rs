//! Common elements for the Evolugrid client and server libraries

pub mod envelope;
pub mod error;
pub mod filter;
pub mod query;
pub mod value_tools;
