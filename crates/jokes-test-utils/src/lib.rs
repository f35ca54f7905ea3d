//! Testing utilities for the jokes gateway workspace
//!
//! Shared doubles, fixtures, and a scriptable fake joke store.

#![allow(missing_docs)]

use jokes_core::{
    AuthDecision, AuthError, Authorizer, CommandInvoker, CommandResult, ExecutionError, Joke,
    JokeService, MaxStringLength,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[cfg(unix)]
pub mod fake_store;

#[cfg(unix)]
pub use fake_store::{write_script, FakeStore};

pub fn max_len(n: usize) -> MaxStringLength {
    MaxStringLength::try_from(n).unwrap()
}

pub fn sample_joke() -> Joke {
    Joke::new("en", "Why did the borrow checker cross the road?")
}

/// Invoker that replays queued results and records every argument vector
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    replies: Mutex<VecDeque<Result<CommandResult, ExecutionError>>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, result: CommandResult) -> Self {
        self.replies.lock().unwrap().push_back(Ok(result));
        self
    }

    pub fn fail_to_start(self) -> Self {
        self.replies.lock().unwrap().push_back(Err(ExecutionError::Spawn {
            program: "/missing/joke-store".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }));
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl CommandInvoker for ScriptedInvoker {
    async fn invoke(&self, args: &[String]) -> Result<CommandResult, ExecutionError> {
        self.calls.lock().unwrap().push(args.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected joke-store invocation: {args:?}"))
    }
}

/// Authorizer with a fixed answer that counts its calls
#[derive(Debug)]
pub struct StaticAuthorizer {
    answer: Option<AuthDecision>,
    calls: AtomicUsize,
    tokens: Mutex<Vec<String>>,
}

impl StaticAuthorizer {
    pub fn allow() -> Self {
        Self::answering(Some(AuthDecision::Allowed))
    }

    pub fn deny(status: u16) -> Self {
        Self::answering(Some(AuthDecision::Denied { status }))
    }

    pub fn unreachable() -> Self {
        Self::answering(None)
    }

    fn answering(answer: Option<AuthDecision>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Authorizer for StaticAuthorizer {
    async fn authorize(&self, token: &str) -> Result<AuthDecision, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.to_string());
        self.answer
            .ok_or_else(|| AuthError::UpstreamUnavailable {
                source: "connection refused".into(),
            })
    }
}

/// Service over a scripted invoker, returning both
pub fn scripted_service(invoker: ScriptedInvoker, max: usize) -> (JokeService, Arc<ScriptedInvoker>) {
    let invoker = Arc::new(invoker);
    let service = JokeService::new(invoker.clone(), max_len(max));
    (service, invoker)
}

pub fn joke_json(joke: &Joke) -> String {
    serde_json::to_string(joke).unwrap()
}
