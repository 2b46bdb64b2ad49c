//! Tests for the shell engine.

mod support;
