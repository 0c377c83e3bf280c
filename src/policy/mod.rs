use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

/// The stored unit of policy.
///
/// A rule is either a constant or a predicate over the request. Rules loaded
/// from untyped data that are neither end up as `Malformed`; evaluating one
/// always denies.
pub enum Rule<R> {
    Constant(bool),
    Predicate(Arc<dyn Fn(&R) -> bool + Send + Sync>),
    Malformed(Value),
}

impl<R> Rule<R> {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        Rule::Predicate(Arc::new(f))
    }

    /// Evaluates the rule as a plain boolean. Malformed rules yield `false`.
    pub fn permits(&self, request: &R) -> bool {
        match self {
            Rule::Constant(value) => *value,
            Rule::Predicate(f) => f(request),
            Rule::Malformed(_) => false,
        }
    }
}

impl<R> Clone for Rule<R> {
    fn clone(&self) -> Self {
        match self {
            Rule::Constant(value) => Rule::Constant(*value),
            Rule::Predicate(f) => Rule::Predicate(Arc::clone(f)),
            Rule::Malformed(value) => Rule::Malformed(value.clone()),
        }
    }
}

impl<R> fmt::Debug for Rule<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Rule::Predicate(_) => f.write_str("Predicate(..)"),
            Rule::Malformed(value) => f.debug_tuple("Malformed").field(value).finish(),
        }
    }
}

impl<R> From<bool> for Rule<R> {
    fn from(value: bool) -> Self {
        Rule::Constant(value)
    }
}

impl<R> From<Value> for Rule<R> {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(value) => Rule::Constant(value),
            other => Rule::Malformed(other),
        }
    }
}

/// Outcome of evaluating a single policy. Not-applicable (no policy) is
/// folded into `Deny` and told apart by the `DenyReason`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny(Denial),
}

impl Decision {
    pub fn deny(action: &str, reason: DenyReason) -> Self {
        Decision::Deny(Denial {
            action: action.to_string(),
            reason,
        })
    }

    pub fn is_permit(&self) -> bool {
        matches!(self, Decision::Permit)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No policy exists for the action.
    NotDefined,
    /// The policy evaluated to `false`.
    Denied,
    /// The stored rule is neither a boolean nor a predicate.
    MalformedRule,
}

/// Explains why an action was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    action: String,
    reason: DenyReason,
}

impl Denial {
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn reason(&self) -> DenyReason {
        self.reason
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            DenyReason::NotDefined => write!(
                f,
                "\"{}\" cannot be performed because it is not defined.",
                self.action
            ),
            DenyReason::Denied => write!(f, "\"{}\" cannot be performed.", self.action),
            DenyReason::MalformedRule => write!(
                f,
                "\"{}\" cannot be performed because the rules are not in the correct format.",
                self.action
            ),
        }
    }
}

/// Evaluates the policy found for `action` (if any) against `request`.
///
/// Never fails: a missing or malformed rule is a denial.
pub fn evaluate<R>(rule: Option<&Rule<R>>, request: &R, action: &str) -> Decision {
    match rule {
        None => Decision::deny(action, DenyReason::NotDefined),
        Some(Rule::Constant(true)) => Decision::Permit,
        Some(Rule::Constant(false)) => Decision::deny(action, DenyReason::Denied),
        Some(Rule::Predicate(f)) => {
            if f(request) {
                Decision::Permit
            } else {
                Decision::deny(action, DenyReason::Denied)
            }
        }
        Some(Rule::Malformed(value)) => {
            tracing::warn!(action, rule = %value, "policy rule is not in the correct format");
            Decision::deny(action, DenyReason::MalformedRule)
        }
    }
}

/// Evaluated policies keyed by action, ready to hand to a presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Permissions(BTreeMap<String, bool>);

impl Permissions {
    pub fn new() -> Self {
        Permissions(BTreeMap::new())
    }

    pub fn get(&self, action: &str) -> Option<bool> {
        self.0.get(action).copied()
    }

    pub fn insert(&mut self, action: &str, allowed: bool) {
        self.0.insert(action.to_string(), allowed);
    }

    /// Copies every entry of `other` into `self`; on collision `other` wins.
    pub fn merge(&mut self, other: Permissions) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, bool)> for Permissions {
    fn from_iter<I: IntoIterator<Item = (&'a str, bool)>>(iter: I) -> Self {
        Permissions(
            iter.into_iter()
                .map(|(action, allowed)| (action.to_string(), allowed))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use serde_json::json;
    use test_case::test_case;

    struct Request {
        role: String,
    }

    fn request(role: &str) -> Request {
        Request { role: role.into() }
    }

    fn admin_only() -> Rule<Request> {
        Rule::predicate(|req: &Request| req.role == "admin")
    }

    #[test]
    fn undefined_action_not_defined() {
        let decision = evaluate::<Request>(None, &request("admin"), "invite");
        assert_matches!(decision, Decision::Deny(denial) if denial.reason() == DenyReason::NotDefined);
    }

    #[test_case(true => true ; "true permits")]
    #[test_case(false => false ; "false denies")]
    fn constant_rule(value: bool) -> bool {
        evaluate(Some(&Rule::Constant(value)), &request("user"), "invite").is_permit()
    }

    #[test_case("admin" => true ; "predicate true permits")]
    #[test_case("user" => false ; "predicate false denies")]
    fn predicate_rule(role: &str) -> bool {
        evaluate(Some(&admin_only()), &request(role), "secret").is_permit()
    }

    #[test]
    fn malformed_rule_denies_with_reason() {
        let rule: Rule<Request> = json!("yes").into();
        let decision = evaluate(Some(&rule), &request("admin"), "invite");
        assert_matches!(decision, Decision::Deny(denial) if denial.reason() == DenyReason::MalformedRule);
    }

    #[test]
    fn json_boolean_becomes_constant() {
        assert_matches!(Rule::<Request>::from(json!(true)), Rule::Constant(true));
        assert_matches!(Rule::<Request>::from(json!(1)), Rule::Malformed(_));
    }

    #[test_case(DenyReason::NotDefined => "\"invite\" cannot be performed because it is not defined." ; "not defined")]
    #[test_case(DenyReason::Denied => "\"invite\" cannot be performed." ; "denied")]
    #[test_case(DenyReason::MalformedRule => "\"invite\" cannot be performed because the rules are not in the correct format." ; "malformed")]
    fn denial_message(reason: DenyReason) -> String {
        match Decision::deny("invite", reason) {
            Decision::Deny(denial) => denial.to_string(),
            Decision::Permit => unreachable!(),
        }
    }

    #[test]
    fn permissions_serialize_as_plain_map() {
        let permissions: Permissions = vec![("invite", true), ("secret", false)]
            .into_iter()
            .collect();
        assert_eq!(
            json!({"invite": true, "secret": false}),
            serde_json::to_value(&permissions).unwrap()
        );
        assert_eq!(
            r#"{"invite":true,"secret":false}"#,
            serde_json::to_string(&permissions).unwrap()
        );
    }

    #[test]
    fn permissions_merge_later_wins() {
        let mut first: Permissions = vec![("invite", true), ("secret", false)]
            .into_iter()
            .collect();
        let second: Permissions = vec![("secret", true)].into_iter().collect();
        first.merge(second);
        assert_eq!(Some(true), first.get("secret"));
        assert_eq!(Some(true), first.get("invite"));
        assert_eq!(2, first.len());
    }

    proptest! {
        #[test]
        fn boolean_rule_ignores_request(value: bool, role in "[a-z]{0,8}") {
            let decision = evaluate(Some(&Rule::Constant(value)), &Request { role }, "act");
            prop_assert_eq!(value, decision.is_permit());
        }

        #[test]
        fn predicate_rule_follows_predicate(role in "(admin|user|[a-z]{1,6})") {
            let expected = role == "admin";
            let decision = evaluate(Some(&admin_only()), &Request { role }, "secret");
            prop_assert_eq!(expected, decision.is_permit());
        }

        #[test]
        fn missing_rule_always_not_defined(action in "[a-z ]{1,16}") {
            let decision = evaluate::<Request>(None, &request("admin"), &action);
            prop_assert_eq!(decision, Decision::deny(&action, DenyReason::NotDefined));
        }
    }
}
