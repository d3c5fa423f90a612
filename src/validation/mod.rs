//! Input validation for component payloads
//!
//! This module provides typed rules evaluated against JSON payloads.
//! Failures are reported as data, never as errors.

mod rules;

pub use rules::{validate, RuleKind, ValidationResult, ValidationRule};
