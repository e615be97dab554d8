//! Service - command handler registry and dispatch.
//!
//! `Service<B>` holds a backend and a set of named command handlers.
//! Each handler receives a `Context<B>` and returns `Result<Value, CommandError>`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, warn};

use super::context::Context;
use super::error::CommandError;
use super::session::Session;

type Guard<B> = Box<dyn Fn(&Context<B>) -> bool + Send + Sync>;
type Handle<B> = Box<dyn Fn(&Context<B>) -> Result<Value, CommandError> + Send + Sync>;

struct CommandHandler<B> {
    guard: Option<Guard<B>>,
    handle: Handle<B>,
}

/// Routes named commands to handler functions.
pub struct Service<B> {
    backend: B,
    handlers: HashMap<String, CommandHandler<B>>,
}

impl<B: Send + Sync + 'static> Service<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            handlers: HashMap::new(),
        }
    }

    /// Register a command handler. Returns `self` for chaining.
    pub fn command<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&Context<B>) -> Result<Value, CommandError> + Send + Sync + 'static,
    {
        self.handlers.insert(
            name.to_string(),
            CommandHandler {
                guard: None,
                handle: Box::new(handler),
            },
        );
        self
    }

    /// Register a command handler behind an input guard.
    ///
    /// When the guard returns `false` the command is rejected with
    /// [`CommandError::GuardRejected`] and the handler never runs.
    pub fn command_guarded<G, F>(mut self, name: &str, guard: G, handler: F) -> Self
    where
        G: Fn(&Context<B>) -> bool + Send + Sync + 'static,
        F: Fn(&Context<B>) -> Result<Value, CommandError> + Send + Sync + 'static,
    {
        self.handlers.insert(
            name.to_string(),
            CommandHandler {
                guard: Some(Box::new(guard)),
                handle: Box::new(handler),
            },
        );
        self
    }

    pub fn dispatch(&self, command: &str, input: Value, session: Session) -> Result<Value, CommandError> {
        let handler = self
            .handlers
            .get(command)
            .ok_or_else(|| CommandError::UnknownCommand(command.to_string()))?;

        let ctx = Context::new(command, input, session, &self.backend);

        if let Some(guard) = &handler.guard {
            if !guard(&ctx) {
                return Err(CommandError::GuardRejected(command.to_string()));
            }
        }

        (handler.handle)(&ctx)
    }

    /// Dispatch a `CommandRequest`, returning a `CommandResponse`.
    ///
    /// Server-side failures are logged in full and answered with a generic body.
    pub fn dispatch_request(&self, request: &CommandRequest) -> CommandResponse {
        let session = Session::from_map(request.session_variables.clone());
        match self.dispatch(&request.command, request.input.clone(), session) {
            Ok(value) => CommandResponse {
                status: 200,
                body: value,
            },
            Err(err) => {
                let status = err.status_code();
                if status >= 500 {
                    error!(command = %request.command, error = %err, "command failed");
                } else {
                    warn!(command = %request.command, status, error = %err, "command rejected");
                }
                CommandResponse {
                    status,
                    body: json!({ "error": err.public_message() }),
                }
            }
        }
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// An inbound command request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    pub input: Value,
    #[serde(default)]
    pub session_variables: HashMap<String, String>,
}

/// Response from dispatching a command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// HTTP status code.
    pub status: u16,
    pub body: Value,
}
