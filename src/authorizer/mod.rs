mod builder;
mod config;
pub use builder::AuthorizerBuilder;
pub use config::AuthorizerConfig;

use std::fmt;
use std::sync::Arc;

use http::StatusCode;

use crate::backend::{InMemoryBackend, IN_MEMORY};
use crate::errors::Result;
use crate::framework::{CanOptions, Connect, Framework};
use crate::policy::{Permissions, Rule};
use crate::registry::{Registry, SharedBackend};

/// Attribute-based authorizer.
///
/// Owns a registry of named back-ends and one framework adapter. Each
/// instance is independent; there is no process-wide default. An application
/// wanting a shared instance builds one at its composition root.
///
/// ```ignore
/// let authorizer = Authorizer::new();
/// authorizer.set_policy("in-memory", "invite a friend", true)?;
///
/// let gate = authorizer.can("in-memory", "invite a friend");
/// gate.handle(&request, &mut response, |err| { /* continue */ });
/// ```
pub struct Authorizer<R, F = Connect> {
    registry: Arc<Registry<R>>,
    framework: F,
    denied_status: StatusCode,
}

impl<R> Authorizer<R, Connect>
where
    R: 'static,
{
    /// Connect adapter, 405 on denial, `in-memory` back-end registered.
    pub fn new() -> Self {
        let registry = Registry::new();
        registry.insert(IN_MEMORY.to_string(), Arc::new(InMemoryBackend::new()));
        Self::from_parts(registry, Connect, StatusCode::METHOD_NOT_ALLOWED)
    }

    pub fn builder() -> AuthorizerBuilder<R, Connect> {
        AuthorizerBuilder::new()
    }
}

impl<R, F> fmt::Debug for Authorizer<R, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("registry", &self.registry)
            .field("denied_status", &self.denied_status)
            .finish()
    }
}

impl<R> Default for Authorizer<R, Connect>
where
    R: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R, F> Authorizer<R, F>
where
    F: Framework<R>,
{
    pub(crate) fn from_parts(registry: Registry<R>, framework: F, denied_status: StatusCode) -> Self {
        Self {
            registry: Arc::new(registry),
            framework,
            denied_status,
        }
    }

    /// Swaps the framework adapter. Back-ends and policies carry over; gates
    /// built earlier keep the behavior of the adapter that built them.
    pub fn with_framework<G>(self, framework: G) -> Authorizer<R, G>
    where
        G: Framework<R>,
    {
        Authorizer {
            registry: self.registry,
            framework,
            denied_status: self.denied_status,
        }
    }

    pub fn registry(&self) -> &Arc<Registry<R>> {
        &self.registry
    }

    /// Status signaled on denial when no deny handler is supplied.
    pub fn denied_status(&self) -> StatusCode {
        self.denied_status
    }

    /// Pipeline entry hook produced by the active framework.
    pub fn initialize(&self) -> F::Init {
        self.framework.initialize(self)
    }

    /// Registers `backend` under its own name.
    pub fn use_backend(&self, backend: SharedBackend<R>) -> Result<&Self> {
        self.registry.use_backend(backend)?;
        Ok(self)
    }

    /// Registers `backend` under `name`, overriding its own name.
    pub fn use_backend_as(&self, name: &str, backend: SharedBackend<R>) -> Result<&Self> {
        self.registry.use_backend_as(name, backend)?;
        Ok(self)
    }

    pub fn unuse(&self, name: &str) -> &Self {
        self.registry.unuse(name);
        self
    }

    pub fn set_policy<T>(&self, backend: &str, action: &str, rule: T) -> Result<&Self>
    where
        T: Into<Rule<R>>,
    {
        self.registry.set_policy(backend, action, rule.into())?;
        Ok(self)
    }

    pub fn unset_policy(&self, backend: &str, action: &str) -> Result<&Self> {
        self.registry.unset_policy(backend, action)?;
        Ok(self)
    }

    /// Builds a gate for `action` on `backend` with the default outcome
    /// handling of the active framework.
    pub fn can(&self, backend: &str, action: &str) -> F::Gate {
        self.can_with(backend, action, CanOptions::default())
    }

    pub fn can_with(&self, backend: &str, action: &str, options: CanOptions) -> F::Gate {
        self.framework.decide(self, backend, action, options)
    }

    /// Evaluates every policy of every registered back-end against `request`.
    pub fn serialize(&self, request: &R) -> Result<Permissions> {
        self.registry.serialize(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use assert_matches::assert_matches;
    use serde_json::json;

    struct Request {
        role: String,
    }

    fn request(role: &str) -> Request {
        Request { role: role.into() }
    }

    /// Framework whose gates report the action they were built for.
    struct Echo;

    impl<R> Framework<R> for Echo {
        type Init = ();
        type Gate = Box<dyn Fn() -> String>;

        fn initialize(&self, _authorizer: &Authorizer<R, Self>) {}

        fn decide(
            &self,
            _authorizer: &Authorizer<R, Self>,
            _backend: &str,
            action: &str,
            _options: CanOptions,
        ) -> Self::Gate {
            let action = action.to_string();
            Box::new(move || format!("can(): {}", action))
        }
    }

    #[test]
    fn default_registers_in_memory() {
        let authorizer = Authorizer::<Request>::new();
        assert_eq!(vec![IN_MEMORY.to_string()], authorizer.registry().names());
        assert_eq!(StatusCode::METHOD_NOT_ALLOWED, authorizer.denied_status());
    }

    #[test]
    fn instances_are_independent() {
        let first = Authorizer::<Request>::new();
        let second = Authorizer::<Request>::new();
        first.set_policy(IN_MEMORY, "invite", true).unwrap();

        assert_eq!(Some(true), first.serialize(&request("user")).unwrap().get("invite"));
        assert!(second.serialize(&request("user")).unwrap().is_empty());
    }

    #[test]
    fn framework_builds_gates() {
        let authorizer = Authorizer::<Request>::new().with_framework(Echo);
        let gate = authorizer.can(IN_MEMORY, "foo");
        assert_eq!("can(): foo", gate());
    }

    #[test]
    fn framework_swap_keeps_existing_gates() {
        let authorizer = Authorizer::<Request>::new();
        authorizer.set_policy(IN_MEMORY, "invite", true).unwrap();
        let connect_gate = authorizer.can(IN_MEMORY, "invite");

        let authorizer = authorizer.with_framework(Echo);
        assert_eq!("can(): invite", authorizer.can(IN_MEMORY, "invite")());

        let mut response = http::Response::new(());
        let mut passed = false;
        connect_gate.handle(&request("user"), &mut response, |err| {
            passed = err.is_none();
        });
        assert!(passed);
    }

    #[test]
    fn use_and_unuse_chain() {
        let authorizer = Authorizer::<Request>::new();
        authorizer
            .use_backend_as("one", Arc::new(InMemoryBackend::new()))
            .unwrap()
            .use_backend(Arc::new(InMemoryBackend::named("two")))
            .unwrap()
            .unuse("one")
            .unuse("never registered");

        assert_eq!(
            vec![IN_MEMORY.to_string(), "two".to_string()],
            authorizer.registry().names()
        );
    }

    #[test]
    fn explicit_name_wins_for_same_instance() {
        let authorizer = Authorizer::<Request>::builder()
            .without_in_memory()
            .build()
            .unwrap();
        let backend: SharedBackend<Request> = Arc::new(InMemoryBackend::named("default"));

        authorizer.use_backend(Arc::clone(&backend)).unwrap();
        authorizer.use_backend_as("bar", backend).unwrap();

        assert_eq!(vec!["bar".to_string()], authorizer.registry().names());
    }

    #[test]
    fn policy_management_on_unknown_backend() {
        let authorizer = Authorizer::<Request>::new();
        assert_matches!(
            authorizer.set_policy("mongodb", "invite", true),
            Err(Error::UnknownBackend(_))
        );
        assert_matches!(
            authorizer.unset_policy("mongodb", "invite"),
            Err(Error::UnknownBackend(_))
        );
    }

    #[test]
    fn policy_changes_are_immediate() {
        let authorizer = Authorizer::<Request>::new();
        let backend = authorizer.registry().backend_at(IN_MEMORY).unwrap();

        authorizer.set_policy(IN_MEMORY, "invite", true).unwrap();
        assert!(backend.decide(&request("user"), "invite").is_permit());

        authorizer.unset_policy(IN_MEMORY, "invite").unwrap();
        authorizer.unset_policy(IN_MEMORY, "invite").unwrap();
        assert!(!backend.decide(&request("user"), "invite").is_permit());
    }

    #[test]
    fn serialize_without_policies() {
        let authorizer = Authorizer::<Request>::new();
        assert!(authorizer.serialize(&request("user")).unwrap().is_empty());

        authorizer.unuse(IN_MEMORY);
        assert!(authorizer.serialize(&request("user")).unwrap().is_empty());
    }

    #[test]
    fn serialize_evaluates_per_request() {
        let authorizer = Authorizer::<Request>::new();
        authorizer
            .set_policy(IN_MEMORY, "invite", true)
            .unwrap()
            .set_policy(
                IN_MEMORY,
                "secret",
                Rule::predicate(|req: &Request| req.role == "admin"),
            )
            .unwrap();

        assert_eq!(
            json!({"invite": true, "secret": false}),
            serde_json::to_value(authorizer.serialize(&request("user")).unwrap()).unwrap()
        );
        assert_eq!(
            json!({"invite": true, "secret": true}),
            serde_json::to_value(authorizer.serialize(&request("admin")).unwrap()).unwrap()
        );
    }
}
