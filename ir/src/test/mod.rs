//! Test support and unit tests.
//!
//! [`eval`] and [`generators`] are available to downstream crates through
//! the `testing` feature.
