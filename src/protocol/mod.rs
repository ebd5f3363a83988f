//! Header constants and header formatting helpers.
//!
//! - **[constants]** - Well-known header names and values used by the interceptors
//! - **[headers]** - Authorization formatting and header map conversions

pub mod constants;
pub mod headers;

pub use headers::{
    build_header_map, format_basic, format_bearer, has_header, header_map_to_btree,
};
