use std::collections::BTreeMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use serde::Deserialize;
use serde_json::Value;

use crate::backend::Backend;
use crate::errors::{Error, Result};
use crate::policy::{self, Decision, Permissions, Rule};
use crate::validator::{ActionValidator, DefaultValidator};

/// Name of the back-end registered by a default `Authorizer`.
pub const IN_MEMORY: &str = "in-memory";

/// Keeps policies in a process-local map from action to rule.
///
/// Reads take a shared lock only long enough to clone the rule out, so
/// predicates run without holding it.
pub struct InMemoryBackend<R, V = DefaultValidator> {
    name: String,
    validator: V,
    policies: RwLock<BTreeMap<String, Rule<R>>>,
}

impl<R> InMemoryBackend<R, DefaultValidator> {
    pub fn new() -> Self {
        Self::named(IN_MEMORY)
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.into(),
            validator: DefaultValidator,
            policies: RwLock::new(BTreeMap::new()),
        }
    }

    /// Loads a back-end from a JSON policy document:
    ///
    /// ```json
    /// { "name": "flags", "policies": { "invite a friend": true } }
    /// ```
    ///
    /// Booleans become constant rules; any other value is kept as a malformed
    /// rule which denies when evaluated.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: PolicyDocument = serde_json::from_str(json).map_err(Error::Deserializing)?;

        let backend = Self::named(&document.name);
        for (action, value) in document.policies {
            backend.set_policy(&action, value.into())?;
        }
        Ok(backend)
    }
}

impl<R, V> InMemoryBackend<R, V>
where
    V: ActionValidator,
{
    pub fn with_validator<W: ActionValidator>(self, validator: W) -> InMemoryBackend<R, W> {
        InMemoryBackend {
            name: self.name,
            validator,
            policies: self.policies,
        }
    }

    pub fn len(&self) -> usize {
        self.policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn rule(&self, action: &str) -> Option<Rule<R>> {
        self.policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(action)
            .cloned()
    }
}

impl<R, V> fmt::Debug for InMemoryBackend<R, V>
where
    V: ActionValidator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("name", &self.name)
            .field("policies", &self.len())
            .finish()
    }
}

impl<R> Default for InMemoryBackend<R, DefaultValidator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, V> Backend<R> for InMemoryBackend<R, V>
where
    V: ActionValidator + Send + Sync,
{
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn set_policy(&self, action: &str, rule: Rule<R>) -> Result<()> {
        self.validator.validate(action)?;
        self.policies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(action.to_string(), rule);
        Ok(())
    }

    fn unset_policy(&self, action: &str) -> Result<()> {
        self.policies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(action);
        Ok(())
    }

    fn decide(&self, request: &R, action: &str) -> Decision {
        let rule = self.rule(action);
        policy::evaluate(rule.as_ref(), request, action)
    }

    fn serialize_all(&self, request: &R) -> Result<Permissions> {
        let snapshot: Vec<(String, Rule<R>)> = self
            .policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(action, rule)| (action.clone(), rule.clone()))
            .collect();

        let mut permissions = Permissions::new();
        for (action, rule) in snapshot {
            permissions.insert(&action, rule.permits(request));
        }
        Ok(permissions)
    }
}

fn default_name() -> String {
    IN_MEMORY.into()
}

#[derive(Deserialize)]
struct PolicyDocument {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default)]
    policies: BTreeMap<String, Value>,
}
