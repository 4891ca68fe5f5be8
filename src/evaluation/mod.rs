mod rollout;
mod rules;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub use rollout::{bucket, is_in_rollout, Bucketer, Sha256Bucketer, BUCKET_COUNT};
pub use rules::{rules_pass, AttributeValue, Operator, RuleValue};

// Flag definition as handed over by the storage layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flag {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// `None` for tenant-level flags that apply to every project of the tenant.
    #[serde(default)]
    pub project_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub enabled: bool,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub rule_logic: RuleLogic,
}

// One targeting condition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub id: String,
    pub attribute: String,
    pub operator: Operator,
    pub value: RuleValue,
    /// Percentage of matching users that see the flag. Only the first rule's
    /// value is consulted; a missing value counts as 0.
    #[serde(default)]
    pub rollout: Option<i64>,
}

/// How a flag's rules combine.
///
/// Stored data only ever produces `And` for the exact string `"AND"`;
/// anything else, typos included, is read as `Or`. A missing or null value
/// is not a string at all and falls back to `And`, the stricter of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>")]
pub enum RuleLogic {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl From<&str> for RuleLogic {
    fn from(value: &str) -> Self {
        if value == "AND" {
            RuleLogic::And
        } else {
            RuleLogic::Or
        }
    }
}

impl From<String> for RuleLogic {
    fn from(value: String) -> Self {
        RuleLogic::from(value.as_str())
    }
}

impl From<Option<String>> for RuleLogic {
    fn from(value: Option<String>) -> Self {
        value.map(RuleLogic::from).unwrap_or_default()
    }
}

// Per-request caller context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationContext {
    pub user_id: String,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeValue>,
}

impl EvaluationContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Null values are reported as absent.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .get(name)
            .filter(|value| !matches!(value, AttributeValue::Null))
    }
}

/// Terminal state reached by one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// The kill switch is off.
    Disabled,
    /// Enabled with no targeting rules.
    Unconditional,
    /// The rule set did not pass.
    RuleRejected,
    /// The rule set passed and the user was bucketed against the first rule's rollout.
    Rollout {
        bucket: u64,
        percentage: i64,
        admitted: bool,
    },
}

impl EvaluationOutcome {
    pub fn is_enabled(&self) -> bool {
        match self {
            EvaluationOutcome::Disabled | EvaluationOutcome::RuleRejected => false,
            EvaluationOutcome::Unconditional => true,
            EvaluationOutcome::Rollout { admitted, .. } => *admitted,
        }
    }

    pub fn reason(&self) -> String {
        match self {
            EvaluationOutcome::Disabled => "Flag is globally disabled".to_string(),
            EvaluationOutcome::Unconditional => {
                "Flag enabled globally, no targeting rules".to_string()
            }
            EvaluationOutcome::RuleRejected => "Targeting rules did not match".to_string(),
            EvaluationOutcome::Rollout {
                bucket,
                percentage,
                admitted: true,
            } => format!("User in {}% rollout (bucket {})", percentage, bucket),
            EvaluationOutcome::Rollout {
                bucket,
                percentage,
                admitted: false,
            } => format!("User not in {}% rollout (bucket {})", percentage, bucket),
        }
    }
}

/// Decides flags for a context. Stateless apart from the bucketing strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator<B = Sha256Bucketer> {
    bucketer: B,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<B: Bucketer> Evaluator<B> {
    pub fn with_bucketer(bucketer: B) -> Self {
        Self { bucketer }
    }

    /// Walks kill switch, rules, then rollout. The order is observable: a
    /// disabled or rejected flag never reaches the bucketer.
    pub fn explain(&self, flag: &Flag, context: &EvaluationContext) -> EvaluationOutcome {
        if !flag.enabled {
            return EvaluationOutcome::Disabled;
        }

        let Some(first) = flag.rules.first() else {
            return EvaluationOutcome::Unconditional;
        };

        if !rules_pass(&flag.rules, flag.rule_logic, context) {
            return EvaluationOutcome::RuleRejected;
        }

        let percentage = first.rollout.unwrap_or(0);
        let bucket = self
            .bucketer
            .bucket(&context.user_id, &flag.id.to_string());

        EvaluationOutcome::Rollout {
            bucket,
            percentage,
            admitted: is_in_rollout(bucket, percentage),
        }
    }

    pub fn evaluate(&self, flag: &Flag, context: &EvaluationContext) -> bool {
        self.explain(flag, context).is_enabled()
    }

    /// Bulk evaluation keyed by flag id.
    pub fn evaluate_all<'a, I>(&self, flags: I, context: &EvaluationContext) -> HashMap<Uuid, bool>
    where
        I: IntoIterator<Item = &'a Flag>,
    {
        flags
            .into_iter()
            .map(|flag| (flag.id, self.evaluate(flag, context)))
            .collect()
    }
}

/// Evaluate if a flag should be enabled for a given context
pub fn evaluate_flag(flag: &Flag, context: &EvaluationContext) -> bool {
    Evaluator::new().evaluate(flag, context)
}

pub fn explain_flag(flag: &Flag, context: &EvaluationContext) -> EvaluationOutcome {
    Evaluator::new().explain(flag, context)
}

pub fn evaluate_all(flags: &[Flag], context: &EvaluationContext) -> HashMap<Uuid, bool> {
    Evaluator::new().evaluate_all(flags, context)
}
