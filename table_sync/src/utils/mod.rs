//! Utilities for table_sync
//!
//! This module provides utility functions used across the library.

pub mod logging;
pub mod naming;

pub use naming::{format_name, get_index_name, truncate_identifier};
