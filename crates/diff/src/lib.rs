//! Difference engine for pagewatch.
//!
//! This crate provides:
//! - Region-based pixel comparison for rendered pages
//! - Byte-hash comparison for static creatives
//! - The change classifier mapping diff metrics to a category
//! - The `Comparator` trait dispatching on target kind

pub mod classify;
pub mod comparator;
pub mod error;
pub mod hash;
pub mod pixel;

pub use classify::{classify, Classification};
pub use comparator::{comparator_for, Comparator, DiffOutcome, RegionMetrics};
pub use error::DiffError;
