//! HTTP routes
//!
//! | Method | Path              | Auth   | Success          |
//! |--------|-------------------|--------|------------------|
//! | GET    | `/`, `/joke`      | none   | 200 JSON joke    |
//! | GET    | `/all`, `/jokes`  | admin  | 200 JSON jokes   |
//! | POST   | `/`, `/joke`      | admin  | 201 text         |
//! | DELETE | `/`, `/joke`      | admin  | 200 text         |
//!
//! Paths are matched before methods so unknown paths answer 404 rather
//! than 405. Privileged routes check credentials before the body is read,
//! so a missing or denied token answers 401 without touching the joke store.

use crate::error::{handle_rejection, text, ApiError, Operation};
use jokes_core::{bearer_token, validate_draft, AuthDecision, Authorizer, JokeDraft, JokeService};
use serde::Deserialize;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::header::AUTHORIZATION;
use warp::http::{HeaderMap, StatusCode};
use warp::hyper::body::Bytes;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

/// Largest accepted request body
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Shared, immutable per-process state
#[derive(Clone)]
pub struct AppState {
    service: Arc<JokeService>,
    authorizer: Arc<dyn Authorizer>,
}

impl AppState {
    /// Create state from a service and an authorizer
    #[must_use]
    pub fn new(service: JokeService, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            service: Arc::new(service),
            authorizer,
        }
    }
}

/// Query string of `GET /joke`
#[derive(Debug, Default, Deserialize)]
pub struct JokeQuery {
    /// Preferred language
    #[serde(rename = "preferredLang")]
    pub preferred_lang: Option<String>,
}

/// Full route tree with rejection handling and request tracing
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let joke_path = warp::path::end().or(warp::path!("joke")).unify();
    let jokes_path = warp::path!("all").or(warp::path!("jokes")).unify();

    let get_joke = joke_path
        .clone()
        .and(warp::get())
        .and(warp::query::<JokeQuery>())
        .and(with_state(state.clone()))
        .then(serve_joke);

    let get_all = jokes_path
        .and(warp::get())
        .and(admin(state.authorizer.clone()))
        .and(with_state(state.clone()))
        .then(serve_all_jokes);

    let add = joke_path
        .clone()
        .and(warp::post())
        .and(admin(state.authorizer.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .then(handle_add);

    let delete = joke_path
        .and(warp::delete())
        .and(admin(state.authorizer.clone()))
        .and(json_body())
        .and(with_state(state))
        .then(handle_delete);

    get_joke
        .or(get_all)
        .unify()
        .or(add)
        .unify()
        .or(delete)
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::trace(|info| {
            tracing::info_span!(
                "request",
                id = %uuid::Uuid::new_v4(),
                method = %info.method(),
                path = %info.path()
            )
        }))
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Require an admin bearer token
///
/// Rejects with `ApiError` before any later filter runs.
fn admin(authorizer: Arc<dyn Authorizer>) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::header::headers_cloned()
        .and(warp::any().map(move || authorizer.clone()))
        .and_then(|headers: HeaderMap, authorizer: Arc<dyn Authorizer>| async move {
            check_admin(&headers, authorizer.as_ref())
                .await
                .map_err(warp::reject::custom)
        })
        .untuple_one()
}

async fn check_admin(headers: &HeaderMap, authorizer: &dyn Authorizer) -> Result<(), ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or(ApiError::MissingCredentials)?;

    match authorizer.authorize(token).await? {
        AuthDecision::Allowed => Ok(()),
        AuthDecision::Denied { status } => Err(ApiError::Denied { status }),
    }
}

fn json_body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::bytes())
}

/// Decode a request body into a joke draft
///
/// # Errors
/// `ApiError::MalformedRequest` if the body is not JSON, not an object, or
/// has non-string `lang`/`text` fields.
pub fn parse_draft(body: &[u8]) -> Result<JokeDraft, ApiError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ApiError::MalformedRequest(e.to_string()))?;
    validate_draft(&value).map_err(|e| ApiError::MalformedRequest(e.to_string()))
}

async fn serve_joke(query: JokeQuery, state: AppState) -> Response {
    match state.service.get_joke(query.preferred_lang.as_deref()).await {
        Ok(joke) => warp::reply::json(&joke).into_response(),
        Err(e) => ApiError::service(Operation::GetJoke, e).into_response(),
    }
}

async fn serve_all_jokes(state: AppState) -> Response {
    match state.service.get_all_jokes().await {
        Ok(jokes) => {
            tracing::info!(count = jokes.len(), "served all jokes");
            warp::reply::json(&jokes).into_response()
        }
        Err(e) => ApiError::service(Operation::GetJokes, e).into_response(),
    }
}

async fn handle_add(body: Bytes, state: AppState) -> Response {
    let draft = match parse_draft(&body) {
        Ok(draft) => draft,
        Err(e) => return e.into_response(),
    };
    match state.service.add_joke(&draft).await {
        Ok(joke) => {
            tracing::info!(lang = %joke.lang, "joke added");
            text("Joke added successfully", StatusCode::CREATED)
        }
        Err(e) => ApiError::service(Operation::AddJoke, e).into_response(),
    }
}

async fn handle_delete(body: Bytes, state: AppState) -> Response {
    let draft = match parse_draft(&body) {
        Ok(draft) => draft,
        Err(e) => return e.into_response(),
    };
    match state.service.delete_joke(&draft).await {
        Ok(joke) => {
            tracing::info!(lang = %joke.lang, "joke deleted");
            text("Joke deleted successfully", StatusCode::OK)
        }
        Err(e) => ApiError::service(Operation::DeleteJoke, e).into_response(),
    }
}
