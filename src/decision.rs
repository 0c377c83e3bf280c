use crate::backend::Backend;
use crate::policy::{Decision, Denial};

/// Request-scoped view over a shared back-end.
///
/// The context reads policies through a borrowed back-end and carries the
/// two continuations for one request. `decide` consumes it, so exactly one
/// continuation runs, exactly once. The shared back-end is never touched
/// beyond the read.
pub struct DecisionContext<'a, R, P, D> {
    backend: &'a dyn Backend<R>,
    on_permit: P,
    on_deny: D,
}

impl<'a, R, P, D> DecisionContext<'a, R, P, D> {
    pub fn new(backend: &'a dyn Backend<R>, on_permit: P, on_deny: D) -> Self {
        Self {
            backend,
            on_permit,
            on_deny,
        }
    }

    pub fn decide<T>(self, request: &R, action: &str) -> T
    where
        P: FnOnce() -> T,
        D: FnOnce(Denial) -> T,
    {
        match self.backend.decide(request, action) {
            Decision::Permit => (self.on_permit)(),
            Decision::Deny(denial) => (self.on_deny)(denial),
        }
    }
}
