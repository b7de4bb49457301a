//! Meta Engine test suite

mod common;
mod failure_tests;
mod query_tests;
