//! Shared test and benchmark support for the Banter quota workspace.

pub mod bench_support;
