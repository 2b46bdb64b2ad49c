//! Tests for the sandbox.

mod session;
mod support;
