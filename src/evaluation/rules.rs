use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use super::{EvaluationContext, Rule, RuleLogic};

/// Scalar value carried in a context attribute or a rule literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

impl AttributeValue {
    /// String form used by `equals` and `in`, so `5` and `"5"` compare equal.
    pub fn canonical(&self) -> Cow<'_, str> {
        match self {
            AttributeValue::Null => Cow::Borrowed("null"),
            AttributeValue::Boolean(b) => Cow::Owned(b.to_string()),
            AttributeValue::Number(n) => Cow::Owned(n.to_string()),
            AttributeValue::String(s) => Cow::Borrowed(s.as_str()),
        }
    }

    /// Only numbers coerce; strings and booleans do not.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value as f64)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

/// Literal a rule compares against: a scalar, or a list for `in`/`not_in`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Single(AttributeValue),
    Multiple(Vec<AttributeValue>),
}

macro_rules! single_rule_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for RuleValue {
                fn from(value: $ty) -> Self {
                    RuleValue::Single(value.into())
                }
            }
        )*
    };
}

single_rule_value!(&str, String, f64, i64, bool, AttributeValue);

impl<T: Into<AttributeValue>> From<Vec<T>> for RuleValue {
    fn from(values: Vec<T>) -> Self {
        values.into_iter().collect()
    }
}

impl<T: Into<AttributeValue>> FromIterator<T> for RuleValue {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        RuleValue::Multiple(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    GreaterThan,
    LessThan,
    /// Any operator name this build does not know. Never matches.
    #[serde(other)]
    Unknown,
}

impl Operator {
    /// Returns `false` if the operator cannot be applied to the values.
    pub fn eval(&self, attribute: &AttributeValue, value: &RuleValue) -> bool {
        self.try_eval(attribute, value).unwrap_or(false)
    }

    fn try_eval(&self, attribute: &AttributeValue, value: &RuleValue) -> Option<bool> {
        match self {
            Self::Equals | Self::NotEquals => {
                let RuleValue::Single(expected) = value else {
                    return None;
                };
                let equal = attribute.canonical() == expected.canonical();
                Some(equal == (*self == Self::Equals))
            }

            Self::In | Self::NotIn => {
                let RuleValue::Multiple(candidates) = value else {
                    return None;
                };
                let actual = attribute.canonical();
                let is_one_of = candidates
                    .iter()
                    .any(|candidate| candidate.canonical() == actual);
                Some(is_one_of == (*self == Self::In))
            }

            Self::GreaterThan | Self::LessThan => {
                let RuleValue::Single(threshold) = value else {
                    return None;
                };
                let actual = attribute.as_f64()?;
                let threshold = threshold.as_f64()?;
                Some(if *self == Self::GreaterThan {
                    actual > threshold
                } else {
                    actual < threshold
                })
            }

            Self::Unknown => None,
        }
    }
}

impl Rule {
    /// A missing (or null) attribute never matches, whatever the operator.
    pub fn matches(&self, context: &EvaluationContext) -> bool {
        match context.attribute(&self.attribute) {
            Some(attribute) => self.operator.eval(attribute, &self.value),
            None => false,
        }
    }
}

/// Combine rules in stored order, stopping at the first rule that decides
/// the verdict. An empty list passes.
pub fn rules_pass(rules: &[Rule], logic: RuleLogic, context: &EvaluationContext) -> bool {
    if rules.is_empty() {
        return true;
    }

    match logic {
        RuleLogic::And => rules.iter().all(|rule| rule.matches(context)),
        RuleLogic::Or => rules.iter().any(|rule| rule.matches(context)),
    }
}
