//! # linguahub-core
//!
//! Core crate for the LinguaHub client stack. Contains configuration
//! schemas, the token accessor seam, and the unified error system.
//!
//! This crate has **no** internal dependencies on other LinguaHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
