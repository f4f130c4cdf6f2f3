//! Evolugrid client library
//!
//! A [controller::GridController] keeps the paging, sort and filter state of
//! one grid. It issues fetches as [transport::FetchRequest]s and builds the
//! grid markup from the responses. [driver::GridDriver] pairs it with a
//! [transport::Transport] for hosts that just want to await each fetch.

pub mod config;
pub mod controller;
pub mod driver;
pub mod form;
pub mod host;
pub mod markup;
pub mod pager;
pub mod render;
pub mod state;
pub mod transport;

pub use evolugrid_common;
