use crate::error::{HostAffinityError, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use std::collections::BTreeMap;
use std::fmt;

/// Label set as carried in object metadata
pub type Labels = BTreeMap<String, String>;

const MAX_NAME_LEN: usize = 63;
const MAX_PREFIX_LEN: usize = 253;

/// Predicate over a label set
///
/// This is the value handed to pod listers. Implementations must be pure:
/// the same label set always yields the same answer.
pub trait LabelMatcher: Send + Sync {
    /// Whether the label set satisfies this predicate
    fn matches(&self, labels: &Labels) -> bool;
}

/// Requirement operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
    Equals,
    NotEquals,
}

impl Operator {
    /// Parse the operator of a `matchExpressions` entry.
    ///
    /// Only the four declarative operators are accepted; `Equals` and
    /// `NotEquals` come from `matchLabels` or direct construction.
    pub fn from_declarative(op: &str) -> Option<Self> {
        match op {
            "In" => Some(Self::In),
            "NotIn" => Some(Self::NotIn),
            "Exists" => Some(Self::Exists),
            "DoesNotExist" => Some(Self::DoesNotExist),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::In => "in",
            Self::NotIn => "notin",
            Self::Exists => "exists",
            Self::DoesNotExist => "!",
            Self::Equals => "=",
            Self::NotEquals => "!=",
        };
        write!(f, "{}", s)
    }
}

/// A single validated `key <op> values` requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    key: String,
    operator: Operator,
    values: Vec<String>,
}

impl Requirement {
    /// Create a requirement, validating the key, the values and the value count
    pub fn new(key: impl Into<String>, operator: Operator, values: Vec<String>) -> Result<Self> {
        let key = key.into();
        let describe = || format!("{} {} {:?}", key, operator, values);

        validate_key(&key).map_err(|reason| HostAffinityError::invalid_selector(describe(), reason))?;

        match operator {
            Operator::In | Operator::NotIn if values.is_empty() => {
                return Err(HostAffinityError::invalid_selector(
                    describe(),
                    format!("operator '{}' requires at least one value", operator),
                ));
            }
            Operator::Exists | Operator::DoesNotExist if !values.is_empty() => {
                return Err(HostAffinityError::invalid_selector(
                    describe(),
                    format!("operator '{}' must not have values", operator),
                ));
            }
            Operator::Equals | Operator::NotEquals if values.len() != 1 => {
                return Err(HostAffinityError::invalid_selector(
                    describe(),
                    format!("operator '{}' requires exactly one value", operator),
                ));
            }
            _ => {}
        }

        for value in &values {
            validate_value(value)
                .map_err(|reason| HostAffinityError::invalid_selector(describe(), reason))?;
        }

        let mut values = values;
        values.sort();
        values.dedup();

        Ok(Self {
            key,
            operator,
            values,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Sorted, deduplicated values
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Evaluate this requirement against a label set
    pub fn matches(&self, labels: &Labels) -> bool {
        let value = labels.get(&self.key);
        match self.operator {
            Operator::In | Operator::Equals => value.is_some_and(|v| self.values.contains(v)),
            Operator::NotIn | Operator::NotEquals => !value.is_some_and(|v| self.values.contains(v)),
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::Equals | Operator::NotEquals => {
                write!(f, "{}{}{}", self.key, self.operator, self.values.join(","))
            }
            Operator::In | Operator::NotIn => {
                write!(f, "{} {} ({})", self.key, self.operator, self.values.join(","))
            }
            Operator::Exists => write!(f, "{}", self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
        }
    }
}

/// Label selector converted from its declarative form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Matches no label set (an absent selector)
    Nothing,
    /// Matches label sets satisfying every requirement; no requirements matches everything
    Requirements(Vec<Requirement>),
}

impl Selector {
    /// Selector matching every label set
    pub fn everything() -> Self {
        Self::Requirements(Vec::new())
    }

    /// Selector matching no label set
    pub fn nothing() -> Self {
        Self::Nothing
    }

    /// Build a selector from requirements, ordered by key
    pub fn from_requirements(mut requirements: Vec<Requirement>) -> Self {
        requirements.sort_by(|a, b| a.key.cmp(&b.key));
        Self::Requirements(requirements)
    }

    pub fn is_everything(&self) -> bool {
        matches!(self, Self::Requirements(reqs) if reqs.is_empty())
    }

    pub fn requirements(&self) -> &[Requirement] {
        match self {
            Self::Nothing => &[],
            Self::Requirements(reqs) => reqs,
        }
    }
}

impl LabelMatcher for Selector {
    fn matches(&self, labels: &Labels) -> bool {
        match self {
            Self::Nothing => false,
            Self::Requirements(reqs) => reqs.iter().all(|r| r.matches(labels)),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => write!(f, "<nothing>"),
            Self::Requirements(reqs) if reqs.is_empty() => write!(f, "<everything>"),
            Self::Requirements(reqs) => {
                let parts: Vec<String> = reqs.iter().map(|r| r.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

/// Convert a declarative label selector into a [`Selector`]
///
/// An absent selector matches nothing. A present selector with neither
/// `matchLabels` nor `matchExpressions` matches everything.
pub fn label_selector_as_selector(selector: Option<&LabelSelector>) -> Result<Selector> {
    let selector = match selector {
        Some(s) => s,
        None => return Ok(Selector::nothing()),
    };

    let match_labels = selector.match_labels.as_ref();
    let match_expressions = selector.match_expressions.as_ref();

    if match_labels.is_none_or(|m| m.is_empty()) && match_expressions.is_none_or(|e| e.is_empty()) {
        return Ok(Selector::everything());
    }

    let mut requirements = Vec::new();

    if let Some(labels) = match_labels {
        for (key, value) in labels {
            requirements.push(Requirement::new(
                key.clone(),
                Operator::Equals,
                vec![value.clone()],
            )?);
        }
    }

    if let Some(expressions) = match_expressions {
        for expr in expressions {
            requirements.push(requirement_from_expression(expr)?);
        }
    }

    Ok(Selector::from_requirements(requirements))
}

fn requirement_from_expression(expr: &LabelSelectorRequirement) -> Result<Requirement> {
    let values = expr.values.clone().unwrap_or_default();
    let operator = Operator::from_declarative(&expr.operator).ok_or_else(|| {
        HostAffinityError::invalid_selector(
            format!("{} {} {:?}", expr.key, expr.operator, values),
            format!("'{}' is not a valid label selector operator", expr.operator),
        )
    })?;
    Requirement::new(expr.key.clone(), operator, values)
}

fn validate_key(key: &str) -> std::result::Result<(), String> {
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if !is_dns_subdomain(prefix) {
            return Err(format!("key prefix '{}' must be a DNS subdomain", prefix));
        }
    }

    if !is_name_part(name) {
        return Err(format!(
            "key name '{}' must be 1-{} alphanumeric characters, '-', '_' or '.', starting and ending with an alphanumeric character",
            name, MAX_NAME_LEN
        ));
    }

    Ok(())
}

fn validate_value(value: &str) -> std::result::Result<(), String> {
    if value.is_empty() || is_name_part(value) {
        Ok(())
    } else {
        Err(format!(
            "value '{}' must be at most {} alphanumeric characters, '-', '_' or '.', starting and ending with an alphanumeric character",
            value, MAX_NAME_LEN
        ))
    }
}

fn is_name_part(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_NAME_LEN {
        return false;
    }
    let bytes = s.as_bytes();
    bytes[0].is_ascii_alphanumeric()
        && bytes[bytes.len() - 1].is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

fn is_dns_subdomain(s: &str) -> bool {
    !s.is_empty() && s.len() <= MAX_PREFIX_LEN && s.split('.').all(is_dns_label)
}

fn is_dns_label(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_NAME_LEN {
        return false;
    }
    let alnum = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    let bytes = s.as_bytes();
    alnum(&bytes[0])
        && alnum(&bytes[bytes.len() - 1])
        && bytes.iter().all(|b| alnum(b) || *b == b'-')
}
