//! Test-only modules: shared doubles and the behaviour suite.

pub mod support;
