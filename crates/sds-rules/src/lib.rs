//! Named condition and rule-action registries, `!`-negation bindings, and
//! the [`RuleOutcome`] taxonomy the executor matches on.
//!
//! Grounded on `core/rule.py` (binding a call plus its conditions) and
//! `conditions/sdsconditions.py` / `rules/sdsrules.py` (the concrete
//! catalogs).

mod actions;
mod conditions;
mod options;
mod outcome;

pub use actions::ActionFn;
pub use conditions::ConditionFn;
pub use options::{Options, OptionsError};
pub use outcome::RuleOutcome;

use sds_collab::Collaborators;
use sds_descriptor::Descriptor;

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("unknown condition or rule function '{0}'")]
    UnknownFunction(String),
    #[error(transparent)]
    Condition(#[from] conditions::ConditionError),
}

/// A condition bound to its options, with an optional `!`-negation applied.
/// `name` is always the underlying (non-negated) function name, so logging
/// can report e.g. `!grid_exists` without losing the original identity.
#[derive(Clone)]
pub struct BoundCondition {
    name: String,
    negated: bool,
    options: Options,
    func: ConditionFn,
}

impl BoundCondition {
    /// Bind `spec` (e.g. `"grid_exists"` or `"!grid_exists"`) with `options`.
    pub fn bind(spec: &str, options: Options) -> Result<Self, RuleError> {
        let (negated, name) = match spec.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, spec),
        };
        let func = *conditions::registry()
            .get(name)
            .ok_or_else(|| RuleError::UnknownFunction(name.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            negated,
            options,
            func,
        })
    }

    /// The underlying condition name, without the `!` prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn negated(&self) -> bool {
        self.negated
    }

    /// The name as it should appear in a log line or `ConditionFailure`,
    /// restoring the `!` prefix if this binding was negated.
    pub fn display_name(&self) -> String {
        if self.negated {
            format!("!{}", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn evaluate(&self, descriptor: &Descriptor, collab: &Collaborators) -> Result<bool, RuleError> {
        let value = (self.func)(&self.options, descriptor, collab)?;
        Ok(if self.negated { !value } else { value })
    }
}

/// A rule action bound to its options.
#[derive(Clone)]
pub struct BoundAction {
    name: String,
    options: Options,
    func: ActionFn,
}

impl BoundAction {
    pub fn bind(name: &str, options: Options) -> Result<Self, RuleError> {
        let func = *actions::registry()
            .get(name)
            .ok_or_else(|| RuleError::UnknownFunction(name.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            options,
            func,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(&self, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
        (self.func)(&self.options, descriptor, collab)
    }
}

/// The names of every condition this crate knows how to bind.
pub fn known_conditions() -> Vec<&'static str> {
    let mut names: Vec<_> = conditions::registry().into_keys().collect();
    names.sort_unstable();
    names
}

/// The names of every rule action this crate knows how to bind.
pub fn known_actions() -> Vec<&'static str> {
    let mut names: Vec<_> = actions::registry().into_keys().collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_preserves_underlying_name() {
        let options = Options::new(serde_json::json!({"remote_root": "zoneA"}).as_object().unwrap().clone());
        let bound = BoundCondition::bind("!file_replicated", options).unwrap();
        assert_eq!(bound.name(), "file_replicated");
        assert!(bound.negated());
        assert_eq!(bound.display_name(), "!file_replicated");
    }

    #[test]
    fn unbound_condition_is_rejected() {
        let err = BoundCondition::bind("not_a_real_condition", Options::empty()).unwrap_err();
        assert!(matches!(err, RuleError::UnknownFunction(_)));
    }

    #[test]
    fn unbound_action_is_rejected() {
        let err = BoundAction::bind("not_a_real_action", Options::empty()).unwrap_err();
        assert!(matches!(err, RuleError::UnknownFunction(_)));
    }
}
