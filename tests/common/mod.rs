//! Common test utilities for batch-loader integration tests

#[allow(dead_code)]
pub mod fixtures;
#[allow(dead_code)]
pub mod recorder;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use recorder::*;
