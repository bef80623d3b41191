//! Cross-module test suites.

mod helpers;
