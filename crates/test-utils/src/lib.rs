//! Shared test utilities for the volume-stream workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Typed sample generators and compression helpers
//! - `.zarray` metadata and NRRD file builders
//! - Approximate equality assertions
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, ZarrayBuilder};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Macro for approximate equality of (z, y, x) triples.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_zyx_approx_eq;
///
/// assert_zyx_approx_eq!((p.z, p.y, p.x), (-46.875, -40.625, -34.375), 1e-9);
/// ```
#[macro_export]
macro_rules! assert_zyx_approx_eq {
    (($z1:expr, $y1:expr, $x1:expr), ($z2:expr, $y2:expr, $x2:expr), $epsilon:expr) => {{
        $crate::assert_approx_eq!($z1, $z2, $epsilon);
        $crate::assert_approx_eq!($y1, $y2, $epsilon);
        $crate::assert_approx_eq!($x1, $x2, $epsilon);
    }};
}
