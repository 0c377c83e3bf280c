mod connect;
pub use connect::{Connect, ConnectGate, ConnectInit, Response};

use std::fmt;
use std::sync::Arc;

use crate::authorizer::Authorizer;
use crate::policy::Denial;

/// Adapts the decision core to the calling convention of a request pipeline.
///
/// An authorizer carries exactly one framework. Gates are built by the
/// framework active at construction time and keep working after the
/// authorizer switches to another one.
pub trait Framework<R>: Sized {
    /// Hook placed at the entry of the pipeline.
    type Init;

    /// Callable that authorizes one request against one action.
    type Gate;

    fn initialize(&self, authorizer: &Authorizer<R, Self>) -> Self::Init;

    /// Builds a gate for `action` on the back-end registered as `backend`.
    ///
    /// Must not look the back-end up; that happens when the gate runs.
    fn decide(
        &self,
        authorizer: &Authorizer<R, Self>,
        backend: &str,
        action: &str,
        options: CanOptions,
    ) -> Self::Gate;
}

pub type PermitHandler = Arc<dyn Fn() + Send + Sync>;
pub type DenyHandler = Arc<dyn Fn(&Denial) + Send + Sync>;

/// Continuations overriding a gate's default outcome handling.
#[derive(Clone, Default)]
pub struct CanOptions {
    on_permit: Option<PermitHandler>,
    on_deny: Option<DenyHandler>,
}

impl CanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_permit<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_permit = Some(Arc::new(f));
        self
    }

    pub fn on_deny<F>(mut self, f: F) -> Self
    where
        F: Fn(&Denial) + Send + Sync + 'static,
    {
        self.on_deny = Some(Arc::new(f));
        self
    }

    pub fn permit_handler(&self) -> Option<&PermitHandler> {
        self.on_permit.as_ref()
    }

    pub fn deny_handler(&self) -> Option<&DenyHandler> {
        self.on_deny.as_ref()
    }
}

impl fmt::Debug for CanOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanOptions")
            .field("on_permit", &self.on_permit.is_some())
            .field("on_deny", &self.on_deny.is_some())
            .finish()
    }
}
