//! Joke service: the four store operations
//!
//! Each operation is a single composition of sanitizer, invoker and
//! validator. Results are always awaited before returning; nothing is
//! deduplicated or retried here.

use crate::error::ServiceError;
use crate::invoker::CommandInvoker;
use crate::sanitize::{sanitize_joke, MaxStringLength};
use crate::types::{CommandResult, Joke, JokeCollection, JokeDraft};
use crate::validation::{validate_joke, validate_jokes};
use serde_json::Value;
use std::sync::Arc;

/// Joke-store command with its positional parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    /// `get [lang]`
    Get {
        /// Preferred language; omitted from argv when `None`
        lang: Option<String>,
    },
    /// `getall`
    GetAll,
    /// `add <lang> <text>`
    Add(Joke),
    /// `delete <lang> <text>`
    Delete(Joke),
}

impl StoreCommand {
    /// Command word as understood by the joke store
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Get { .. } => "get",
            Self::GetAll => "getall",
            Self::Add(_) => "add",
            Self::Delete(_) => "delete",
        }
    }

    /// Arguments following the database path
    #[must_use]
    pub fn into_args(self) -> Vec<String> {
        let name = self.name().to_owned();
        match self {
            Self::Get { lang } => std::iter::once(name).chain(lang).collect(),
            Self::GetAll => vec![name],
            Self::Add(joke) | Self::Delete(joke) => vec![name, joke.lang, joke.text],
        }
    }
}

/// Joke operations backed by the joke store
#[derive(Clone)]
pub struct JokeService {
    invoker: Arc<dyn CommandInvoker>,
    max_len: MaxStringLength,
}

impl std::fmt::Debug for JokeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JokeService")
            .field("max_len", &self.max_len)
            .finish_non_exhaustive()
    }
}

impl JokeService {
    /// Create service over an invoker
    #[inline]
    #[must_use]
    pub fn new(invoker: Arc<dyn CommandInvoker>, max_len: MaxStringLength) -> Self {
        Self { invoker, max_len }
    }

    /// Fetch one joke, optionally in a preferred language
    ///
    /// An empty `preferred_lang` is treated as absent.
    ///
    /// # Errors
    /// - `ServiceError::Execution` if the store cannot be run
    /// - `ServiceError::InvalidFormat` if the store fails or prints something other than a joke
    pub async fn get_joke(&self, preferred_lang: Option<&str>) -> Result<Joke, ServiceError> {
        let lang = preferred_lang.filter(|lang| !lang.is_empty()).map(str::to_owned);
        let value = self.read(StoreCommand::Get { lang }).await?;
        validate_joke(&value).map_err(|e| ServiceError::InvalidFormat(e.to_string()))
    }

    /// Fetch every joke
    ///
    /// # Errors
    /// Same as [`JokeService::get_joke`], validated as a collection.
    pub async fn get_all_jokes(&self) -> Result<JokeCollection, ServiceError> {
        let value = self.read(StoreCommand::GetAll).await?;
        validate_jokes(&value).map_err(|e| ServiceError::InvalidFormat(e.to_string()))
    }

    /// Sanitize and store a joke
    ///
    /// Returns the sanitized joke that was passed to the store.
    ///
    /// # Errors
    /// - `ServiceError::Execution` if the store cannot be run
    /// - `ServiceError::OperationFailed` if the store reports failure
    pub async fn add_joke(&self, draft: &JokeDraft) -> Result<Joke, ServiceError> {
        let joke = sanitize_joke(draft, self.max_len);
        self.mutate(StoreCommand::Add(joke.clone())).await?;
        Ok(joke)
    }

    /// Sanitize a joke and delete its value match from the store
    ///
    /// # Errors
    /// Same as [`JokeService::add_joke`].
    pub async fn delete_joke(&self, draft: &JokeDraft) -> Result<Joke, ServiceError> {
        let joke = sanitize_joke(draft, self.max_len);
        self.mutate(StoreCommand::Delete(joke.clone())).await?;
        Ok(joke)
    }

    async fn run(&self, command: StoreCommand) -> Result<CommandResult, ServiceError> {
        let args = command.into_args();
        Ok(self.invoker.invoke(&args).await?)
    }

    async fn read(&self, command: StoreCommand) -> Result<Value, ServiceError> {
        let name = command.name();
        let result = self.run(command).await?;
        if !result.succeeded {
            return Err(ServiceError::InvalidFormat(format!(
                "`{name}` reported failure: {}",
                result.output.trim()
            )));
        }
        serde_json::from_str(&result.output)
            .map_err(|e| ServiceError::InvalidFormat(format!("`{name}` output is not JSON: {e}")))
    }

    async fn mutate(&self, command: StoreCommand) -> Result<(), ServiceError> {
        let name = command.name();
        let result = self.run(command).await?;
        if result.succeeded {
            Ok(())
        } else {
            tracing::debug!(command = name, output = %result.output.trim(), "joke store rejected command");
            Err(ServiceError::OperationFailed { command: name })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionError;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    mockall::mock! {
        Invoker {}

        #[async_trait::async_trait]
        impl CommandInvoker for Invoker {
            async fn invoke(&self, args: &[String]) -> Result<CommandResult, ExecutionError>;
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    fn service(mock: MockInvoker, max: usize) -> JokeService {
        JokeService::new(Arc::new(mock), MaxStringLength::try_from(max).unwrap())
    }

    #[test]
    fn command_argument_mapping() {
        assert_eq!(StoreCommand::Get { lang: None }.into_args(), strings(&["get"]));
        assert_eq!(
            StoreCommand::Get { lang: Some("pt".into()) }.into_args(),
            strings(&["get", "pt"])
        );
        assert_eq!(StoreCommand::GetAll.into_args(), strings(&["getall"]));
        assert_eq!(
            StoreCommand::Delete(Joke::new("en", "a b")).into_args(),
            strings(&["delete", "en", "a b"])
        );
    }

    #[tokio::test]
    async fn get_joke_omits_empty_language() {
        let mut mock = MockInvoker::new();
        mock.expect_invoke()
            .with(eq(strings(&["get"])))
            .times(2)
            .returning(|_| Ok(CommandResult::success(r#"{"lang":"en","text":"hi"}"#)));
        let svc = service(mock, 10);

        assert_eq!(svc.get_joke(None).await.unwrap(), Joke::new("en", "hi"));
        assert_eq!(svc.get_joke(Some("")).await.unwrap(), Joke::new("en", "hi"));
    }

    #[tokio::test]
    async fn get_joke_rejects_failed_or_malformed_output() {
        for result in [
            CommandResult::failure(r#"{"lang":"en","text":"hi"}"#),
            CommandResult::success("not json"),
            CommandResult::success(r#"{"lang":"en"}"#),
        ] {
            let mut mock = MockInvoker::new();
            mock.expect_invoke().times(1).return_once(move |_| Ok(result));
            let err = service(mock, 10).get_joke(Some("en")).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidFormat(_)), "got {err:?}");
        }
    }

    #[tokio::test]
    async fn get_all_validates_collection() {
        let mut mock = MockInvoker::new();
        mock.expect_invoke()
            .with(eq(strings(&["getall"])))
            .return_once(|_| Ok(CommandResult::success(r#"{"jokes":[{"lang":"en","text":"a"}]}"#)));
        let jokes = service(mock, 10).get_all_jokes().await.unwrap();
        assert_eq!(jokes.jokes, vec![Joke::new("en", "a")]);
    }

    #[tokio::test]
    async fn add_sanitizes_before_invoking() {
        let mut mock = MockInvoker::new();
        mock.expect_invoke()
            .with(eq(strings(&["add", "en", "abcde"])))
            .times(1)
            .return_once(|_| Ok(CommandResult::success("")));
        let stored = service(mock, 5)
            .add_joke(&JokeDraft::new("  en  ", "  abcdefgh "))
            .await
            .unwrap();
        assert_eq!(stored, Joke::new("en", "abcde"));
    }

    #[tokio::test]
    async fn mutation_failure_is_operation_failed() {
        let mut mock = MockInvoker::new();
        mock.expect_invoke()
            .with(eq(strings(&["delete", "", ""])))
            .times(1)
            .return_once(|_| Ok(CommandResult::failure("ERROR: no such joke")));
        let err = service(mock, 5).delete_joke(&JokeDraft::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::OperationFailed { command: "delete" }));
    }

    #[tokio::test]
    async fn execution_errors_propagate() {
        let mut mock = MockInvoker::new();
        mock.expect_invoke().return_once(|_| {
            Err(ExecutionError::Spawn {
                program: "missing".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        });
        let err = service(mock, 5).get_all_jokes().await.unwrap_err();
        assert!(err.is_execution());
    }
}
