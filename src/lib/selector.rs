//! Label selectors with Kubernetes set semantics.
//!
//! Supports the textual form accepted by the API server (`a=b`, `a==b`, `a!=b`,
//! `a in (x,y)`, `a notin (x)`, `a`, `!a`) and the structured
//! `LabelSelector` form carried inside resource specs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

use crate::SelectorError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::In => "in",
            Operator::NotIn => "notin",
            Operator::Exists => "exists",
            Operator::DoesNotExist => "!",
        }
    }
}

/// A single `key <op> values` term of a selector
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requirement {
    key: String,
    operator: Operator,
    values: BTreeSet<String>,
}

impl Requirement {
    pub fn new<I, V>(
        key: impl Into<String>,
        operator: Operator,
        values: I,
    ) -> Result<Self, SelectorError>
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let key = key.into();
        if key.is_empty() {
            return Err(SelectorError::EmptyKey(operator.as_str().to_string()));
        }
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();

        let expected = match operator {
            Operator::Equals | Operator::NotEquals if values.len() != 1 => Some("exactly one value"),
            Operator::In | Operator::NotIn if values.is_empty() => Some("at least one value"),
            Operator::Exists | Operator::DoesNotExist if !values.is_empty() => Some("no values"),
            _ => None,
        };
        if let Some(expected) = expected {
            return Err(SelectorError::InvalidValues {
                key,
                operator: operator.as_str().to_string(),
                expected,
            });
        }

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

    pub fn values(&self) -> &BTreeSet<String> {
        &self.values
    }

    /// Negative operators match objects that do not carry the key at all
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match self.operator {
            Operator::Equals | Operator::In => {
                value.is_some_and(|v| self.values.contains(v))
            }
            Operator::NotEquals | Operator::NotIn => {
                value.is_none_or(|v| !self.values.contains(v))
            }
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = || self.values.iter().cloned().collect::<Vec<_>>().join(",");
        match self.operator {
            Operator::Equals => write!(f, "{}={}", self.key, joined()),
            Operator::NotEquals => write!(f, "{}!={}", self.key, joined()),
            Operator::In => write!(f, "{} in ({})", self.key, joined()),
            Operator::NotIn => write!(f, "{} notin ({})", self.key, joined()),
            Operator::Exists => write!(f, "{}", self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
        }
    }
}

/// Conjunction of requirements; the empty selector matches everything
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn with(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }

    /// Parse an optional selector string, treating `None` as match-all
    pub fn parse_optional(selector: Option<&str>) -> Result<Self, SelectorError> {
        match selector {
            Some(s) => s.parse(),
            None => Ok(Self::everything()),
        }
    }

    pub fn from_label_selector(selector: &LabelSelector) -> Result<Self, SelectorError> {
        let mut requirements = Vec::new();

        for (key, value) in selector.match_labels.iter().flatten() {
            requirements.push(Requirement::new(key.clone(), Operator::Equals, [value.clone()])?);
        }

        for expr in selector.match_expressions.iter().flatten() {
            let operator = match expr.operator.as_str() {
                "In" => Operator::In,
                "NotIn" => Operator::NotIn,
                "Exists" => Operator::Exists,
                "DoesNotExist" => Operator::DoesNotExist,
                other => return Err(SelectorError::UnknownOperator(other.to_string())),
            };
            let values = expr.values.clone().unwrap_or_default();
            requirements.push(Requirement::new(expr.key.clone(), operator, values)?);
        }

        Ok(Self { requirements })
    }
}

impl TryFrom<&LabelSelector> for Selector {
    type Error = SelectorError;

    fn try_from(selector: &LabelSelector) -> Result<Self, Self::Error> {
        Self::from_label_selector(selector)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self.requirements.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", terms.join(","))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self::everything());
        }

        let requirements = split_terms(s)
            .into_iter()
            .map(parse_term)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { requirements })
    }
}

/// Split on commas that are not inside a parenthesised value set
fn split_terms(s: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                terms.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    terms.push(&s[start..]);
    terms
}

fn parse_term(raw: &str) -> Result<Requirement, SelectorError> {
    let term = raw.trim();
    if term.is_empty() {
        return Err(SelectorError::EmptyKey(raw.to_string()));
    }

    if let Some(key) = term.strip_prefix('!') {
        return Requirement::new(key.trim(), Operator::DoesNotExist, Vec::<String>::new());
    }

    if let Some(open) = term.find('(') {
        let head: Vec<&str> = term[..open].split_whitespace().collect();
        let [key, op] = head.as_slice() else {
            return Err(SelectorError::MalformedSet(term.to_string()));
        };
        let operator = match *op {
            "in" => Operator::In,
            "notin" => Operator::NotIn,
            other => return Err(SelectorError::UnknownOperator(other.to_string())),
        };
        let inner = term[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| SelectorError::MalformedSet(term.to_string()))?;
        let values: Vec<&str> = inner
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        return Requirement::new(*key, operator, values);
    }

    for (token, operator) in [
        ("!=", Operator::NotEquals),
        ("==", Operator::Equals),
        ("=", Operator::Equals),
    ] {
        if let Some((key, value)) = term.split_once(token) {
            return Requirement::new(key.trim(), operator, [value.trim()]);
        }
    }

    if term.contains(char::is_whitespace) {
        let op = term.split_whitespace().nth(1).unwrap_or(term);
        return Err(SelectorError::UnknownOperator(op.to_string()));
    }

    Requirement::new(term, Operator::Exists, Vec::<String>::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_selector_matches_everything() {
        let selector: Selector = "".parse().unwrap();
        assert!(selector.is_empty());
        assert!(selector.matches(&labels(&[])));
        assert!(selector.matches(&labels(&[("app", "web")])));
    }

    #[test]
    fn equality_requirements() {
        let selector: Selector = "app=web, tier==frontend".parse().unwrap();
        assert!(selector.matches(&labels(&[("app", "web"), ("tier", "frontend")])));
        assert!(!selector.matches(&labels(&[("app", "web")])));
        assert!(!selector.matches(&labels(&[("app", "db"), ("tier", "frontend")])));
    }

    #[test]
    fn inequality_matches_missing_key() {
        let selector: Selector = "env!=prod".parse().unwrap();
        assert!(selector.matches(&labels(&[])));
        assert!(selector.matches(&labels(&[("env", "dev")])));
        assert!(!selector.matches(&labels(&[("env", "prod")])));
    }

    #[test]
    fn set_requirements() {
        let selector: Selector = "region in (us, eu),zone notin (z1)".parse().unwrap();
        assert_eq!(selector.requirements().len(), 2);
        assert!(selector.matches(&labels(&[("region", "eu")])));
        assert!(selector.matches(&labels(&[("region", "us"), ("zone", "z2")])));
        assert!(!selector.matches(&labels(&[("region", "us"), ("zone", "z1")])));
        assert!(!selector.matches(&labels(&[("region", "ap")])));
    }

    #[test]
    fn existence_requirements() {
        let selector: Selector = "managed,!legacy".parse().unwrap();
        assert!(selector.matches(&labels(&[("managed", "")])));
        assert!(!selector.matches(&labels(&[("managed", "true"), ("legacy", "1")])));
        assert!(!selector.matches(&labels(&[])));
    }

    #[test]
    fn display_is_canonical() {
        let selector: Selector = "b in (y,x), a=1, !c, d".parse().unwrap();
        assert_eq!(selector.to_string(), "b in (x,y),a=1,!c,d");
        let reparsed: Selector = selector.to_string().parse().unwrap();
        assert_eq!(reparsed, selector);
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(matches!(
            "a in x".parse::<Selector>(),
            Err(SelectorError::UnknownOperator(_))
        ));
        assert!(matches!(
            "a in (x".parse::<Selector>(),
            Err(SelectorError::MalformedSet(_))
        ));
        assert!(matches!(
            "a between (x)".parse::<Selector>(),
            Err(SelectorError::UnknownOperator(_))
        ));
        assert!(matches!(
            "a in ()".parse::<Selector>(),
            Err(SelectorError::InvalidValues { .. })
        ));
        assert!(matches!(
            "a=b,".parse::<Selector>(),
            Err(SelectorError::EmptyKey(_))
        ));
        assert!(matches!("=b".parse::<Selector>(), Err(SelectorError::EmptyKey(_))));
    }

    #[test]
    fn converts_structured_label_selector() {
        let selector = LabelSelector {
            match_labels: Some(BTreeMap::from([("app".to_string(), "web".to_string())])),
            match_expressions: Some(vec![
                LabelSelectorRequirement {
                    key: "tier".into(),
                    operator: "In".into(),
                    values: Some(vec!["frontend".into(), "edge".into()]),
                },
                LabelSelectorRequirement {
                    key: "canary".into(),
                    operator: "DoesNotExist".into(),
                    values: None,
                },
            ]),
        };
        let selector = Selector::try_from(&selector).unwrap();
        assert!(selector.matches(&labels(&[("app", "web"), ("tier", "edge")])));
        assert!(!selector.matches(&labels(&[("app", "web"), ("tier", "edge"), ("canary", "1")])));
        assert!(!selector.matches(&labels(&[("app", "web"), ("tier", "backend")])));
    }

    #[test]
    fn structured_selector_rejects_unknown_operator() {
        let selector = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "tier".into(),
                operator: "Gt".into(),
                values: Some(vec!["1".into()]),
            }]),
        };
        assert_eq!(
            Selector::from_label_selector(&selector),
            Err(SelectorError::UnknownOperator("Gt".into()))
        );
    }
}
