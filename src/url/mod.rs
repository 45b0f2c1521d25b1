//! URL handling module
//!
//! This module provides input normalization, host extraction, and public-suffix-aware
//! registrable domain extraction.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{domain_of_line, extract_domain, registrable_domain, registrable_domain_of_host};
pub use normalize::{has_http_scheme, normalize_input};
