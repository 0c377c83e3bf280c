use std::sync::Arc;

use http::StatusCode;

use crate::authorizer::{Authorizer, AuthorizerConfig};
use crate::backend::{InMemoryBackend, IN_MEMORY};
use crate::errors::{Error, Result};
use crate::framework::{Connect, Framework};
use crate::registry::{Registry, SharedBackend};

/// Builds an `Authorizer` from a JSON configuration and explicit overrides.
///
/// Overrides set with `with_*` take precedence over the JSON document,
/// whatever the call order.
pub struct AuthorizerBuilder<R, F = Connect> {
    json: Option<String>,
    denied_status_code: Option<u16>,
    in_memory: Option<bool>,
    framework: F,
    backends: Vec<(Option<String>, SharedBackend<R>)>,
}

impl<R> AuthorizerBuilder<R, Connect> {
    pub fn new() -> Self {
        Self {
            json: None,
            denied_status_code: None,
            in_memory: None,
            framework: Connect,
            backends: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Self {
        Self {
            json: Some(json.into()),
            ..Self::new()
        }
    }
}

impl<R> Default for AuthorizerBuilder<R, Connect> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, F> AuthorizerBuilder<R, F>
where
    R: 'static,
    F: Framework<R>,
{
    pub fn with_config(mut self, config: &AuthorizerConfig) -> Self {
        self.denied_status_code = Some(config.denied_status_code);
        self.in_memory = Some(config.in_memory);
        self
    }

    pub fn with_denied_status_code(mut self, code: u16) -> Self {
        self.denied_status_code = Some(code);
        self
    }

    /// Skips registering the default `in-memory` back-end.
    pub fn without_in_memory(mut self) -> Self {
        self.in_memory = Some(false);
        self
    }

    /// Registers `backend` under its own name.
    pub fn with_backend(mut self, backend: SharedBackend<R>) -> Self {
        self.backends.push((None, backend));
        self
    }

    /// Registers `backend` under `name`.
    pub fn with_named_backend(mut self, name: &str, backend: SharedBackend<R>) -> Self {
        self.backends.push((Some(name.into()), backend));
        self
    }

    pub fn with_framework<G>(self, framework: G) -> AuthorizerBuilder<R, G>
    where
        G: Framework<R>,
    {
        AuthorizerBuilder {
            json: self.json,
            denied_status_code: self.denied_status_code,
            in_memory: self.in_memory,
            framework,
            backends: self.backends,
        }
    }

    pub fn build(self) -> Result<Authorizer<R, F>> {
        let mut config = match &self.json {
            Some(json) => AuthorizerConfig::from_json(json)?,
            None => AuthorizerConfig::default(),
        };
        if let Some(code) = self.denied_status_code {
            config.denied_status_code = code;
        }
        if let Some(in_memory) = self.in_memory {
            config.in_memory = in_memory;
        }

        let denied_status = StatusCode::from_u16(config.denied_status_code)
            .map_err(|_| Error::InvalidStatusCode(config.denied_status_code))?;

        let registry = Registry::new();
        if config.in_memory {
            registry.use_backend_as(IN_MEMORY, Arc::new(InMemoryBackend::new()))?;
        }
        for (name, backend) in self.backends {
            match name {
                Some(name) => registry.use_backend_as(&name, backend)?,
                None => registry.use_backend(backend)?,
            }
        }

        Ok(Authorizer::from_parts(registry, self.framework, denied_status))
    }
}
