//! Declarative input validation rules

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Check performed by a [`ValidationRule`]
///
/// Type checks only apply to fields that are present; pair them with
/// `Required` to demand presence as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Field must be present and not null
    Required,
    Number,
    String,
    Boolean,
    Array,
    Object,
}

impl RuleKind {
    /// Whether `value` (None when absent) passes this check
    fn accepts(&self, value: Option<&Value>) -> bool {
        let value = match value {
            None | Some(Value::Null) => return !matches!(self, RuleKind::Required),
            Some(v) => v,
        };
        match self {
            RuleKind::Required => true,
            RuleKind::Number => value.is_number(),
            RuleKind::String => value.is_string(),
            RuleKind::Boolean => value.is_boolean(),
            RuleKind::Array => value.is_array(),
            RuleKind::Object => value.is_object(),
        }
    }
}

/// One validation rule on a top-level field of the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub field: String,
    #[serde(rename = "type")]
    pub kind: RuleKind,
    pub message: String,
}

impl ValidationRule {
    pub fn new(field: impl Into<String>, kind: RuleKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn required(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, RuleKind::Required, message)
    }

    pub fn number(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, RuleKind::Number, message)
    }

    /// Whether `data` satisfies this rule
    pub fn check(&self, data: &Value) -> bool {
        self.kind.accepts(data.get(&self.field))
    }
}

/// Outcome of validating a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Evaluate every rule against `data`, collecting failures in rule order
pub fn validate(rules: &[ValidationRule], data: &Value) -> ValidationResult {
    let errors: Vec<String> = rules
        .iter()
        .filter(|rule| !rule.check(data))
        .map(|rule| rule.message.clone())
        .collect();

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}
