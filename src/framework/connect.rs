use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, instrument, warn};

use crate::authorizer::Authorizer;
use crate::decision::DecisionContext;
use crate::errors::Error;
use crate::framework::{CanOptions, Framework};
use crate::policy::Denial;
use crate::registry::Registry;

/// Response-like object a gate signals denial on.
pub trait Response {
    fn send_status(&mut self, status: StatusCode);
}

impl<B> Response for http::Response<B> {
    fn send_status(&mut self, status: StatusCode) {
        *self.status_mut() = status;
    }
}

/// Continuation-passing adapter for `fn(request, response, next)` pipelines.
///
/// On permit the gate calls `next(None)`; on deny it sets the authorizer's
/// denied status on the response. A gate whose back-end is not registered
/// calls `next` with the error instead of denying.
#[derive(Debug, Default, Clone, Copy)]
pub struct Connect;

impl<R> Framework<R> for Connect {
    type Init = ConnectInit;
    type Gate = ConnectGate<R>;

    fn initialize(&self, _authorizer: &Authorizer<R, Self>) -> ConnectInit {
        ConnectInit
    }

    fn decide(
        &self,
        authorizer: &Authorizer<R, Self>,
        backend: &str,
        action: &str,
        options: CanOptions,
    ) -> ConnectGate<R> {
        ConnectGate {
            registry: Arc::clone(authorizer.registry()),
            backend: backend.to_string(),
            action: action.to_string(),
            options,
            denied_status: authorizer.denied_status(),
        }
    }
}

/// Pipeline entry hook. Passes every request through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConnectInit;

impl ConnectInit {
    pub fn handle<R, S, N>(&self, _request: &R, _response: &mut S, next: N)
    where
        N: FnOnce(Option<Error>),
    {
        next(None);
    }
}

pub struct ConnectGate<R> {
    registry: Arc<Registry<R>>,
    backend: String,
    action: String,
    options: CanOptions,
    denied_status: StatusCode,
}

impl<R> fmt::Debug for ConnectGate<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectGate")
            .field("backend", &self.backend)
            .field("action", &self.action)
            .field("options", &self.options)
            .field("denied_status", &self.denied_status)
            .finish()
    }
}

impl<R> ConnectGate<R> {
    #[instrument(
        level = "debug",
        skip_all,
        fields(backend = %self.backend, action = %self.action)
    )]
    pub fn handle<S, N>(&self, request: &R, response: &mut S, next: N)
    where
        S: Response,
        N: FnOnce(Option<Error>),
    {
        let backend = match self.registry.backend_at(&self.backend) {
            Some(backend) => backend,
            None => {
                warn!("gate invoked against unknown authorization back-end");
                return next(Some(Error::UnresolvedBackend(self.backend.clone())));
            }
        };

        let on_permit = || {
            debug!("permitted");
            match self.options.permit_handler() {
                Some(handler) => handler(),
                None => next(None),
            }
        };

        let on_deny = |denial: Denial| {
            debug!(reason = %denial, "denied");
            match self.options.deny_handler() {
                Some(handler) => handler(&denial),
                None => response.send_status(self.denied_status),
            }
        };

        DecisionContext::new(backend.as_ref(), on_permit, on_deny).decide(request, &self.action);
    }
}
