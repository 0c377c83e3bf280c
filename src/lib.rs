#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]
//! Attribute-based authorization gate.
//!
//! An [`Authorizer`] keeps named policy [`Backend`]s and hands out gates that
//! decide, per request, whether an action is permitted. How a gate is called
//! is up to the active [`Framework`]; [`Connect`] serves
//! `fn(request, response, next)` pipelines.
mod authorizer;
mod backend;
mod decision;
mod errors;
mod framework;
mod policy;
mod registry;
mod validator;

pub use authorizer::{Authorizer, AuthorizerBuilder, AuthorizerConfig};
pub use backend::{Backend, InMemoryBackend, IN_MEMORY};
pub use decision::DecisionContext;
pub use errors::{Error, Result};
pub use framework::{
    CanOptions, Connect, ConnectGate, ConnectInit, DenyHandler, Framework, PermitHandler, Response,
};
pub use policy::{evaluate, Decision, Denial, DenyReason, Permissions, Rule};
pub use registry::{Registry, SharedBackend};
pub use validator::{ActionValidator, DefaultValidator};
