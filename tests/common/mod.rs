//! Common test utilities for media-dl integration tests

#[allow(dead_code)]
pub mod fakes;
#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use fakes::*;
#[allow(unused_imports)]
pub use fixtures::*;
