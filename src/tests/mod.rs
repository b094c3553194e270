//! Cross-module test suites
