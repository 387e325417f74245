#![allow(dead_code)]

mod harness;
pub use harness::*;

mod quota_flow_tests;
