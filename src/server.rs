use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::framer;
use crate::launcher::{self, LaunchSpec};
use crate::prompt::build_prompt;
use crate::protocol::{ChatCompletionRequest, ModelCard, ModelList};
use crate::relay::{self, RelayHandle};
use crate::translator::{Output, ResponseMode, StreamState};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use std::convert::Infallible;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{AllowHeaders, Any, CorsLayer};

/// Models advertised on `/v1/models`.
pub const MODELS: [&str; 3] = ["gemini-2.0-flash", "gemini-2.5-pro", "gemini-2.5-flash"];

struct ServerState {
    config: BridgeConfig,
}

type ServerResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub async fn run(config: BridgeConfig) -> ServerResult<()> {
    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    tracing::info!(
        "Gemini-to-OpenAI bridge running on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, router(config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn router(config: BridgeConfig) -> Router {
    let state = Arc::new(ServerState { config });

    Router::new()
        .route("/v1/models", get(list_models))
        .route("/v1/chat/completions", post(chat_completions))
        .layer(cors_layer())
        .with_state(state)
}

/// Any origin and method; preflights get back whatever headers they ask for.
/// `Authorization` cannot be covered by a `*` wildcard, hence the mirroring.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(AllowHeaders::mirror_request())
}

async fn list_models(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Result<Json<ModelList>, BridgeError> {
    authorize(&headers, &state.config.api_key)?;

    let created = framer::unix_now();
    Ok(Json(ModelList {
        object: "list",
        data: MODELS
            .iter()
            .map(|&id| ModelCard {
                id,
                object: "model",
                created,
                owned_by: "google",
            })
            .collect(),
    }))
}

async fn chat_completions(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, BridgeError> {
    authorize(&headers, &state.config.api_key)?;

    let request: ChatCompletionRequest = serde_json::from_slice(&body)
        .map_err(|err| BridgeError::InvalidRequest(format!("Invalid request body: {err}")))?;
    let messages = request
        .messages
        .ok_or_else(|| BridgeError::InvalidRequest("Missing messages".to_string()))?;

    let prompt = build_prompt(&messages);
    if prompt.is_empty() {
        return Err(BridgeError::InvalidRequest(
            "messages must not be empty".to_string(),
        ));
    }

    let model = request
        .model
        .filter(|model| !model.trim().is_empty())
        .unwrap_or_else(|| state.config.default_model.clone());
    let mode = if request.stream.unwrap_or(false) {
        ResponseMode::Streaming
    } else {
        ResponseMode::Buffered
    };

    let process = launcher::launch(&LaunchSpec::new(&state.config, &prompt, &model))?;
    let handle = relay::spawn(process, StreamState::new(mode, model));

    match mode {
        ResponseMode::Streaming => Ok(streaming_response(handle)),
        ResponseMode::Buffered => buffered_response(handle).await,
    }
}

fn streaming_response(handle: RelayHandle) -> Response {
    let RelayHandle { outputs, guard } = handle;

    // The guard lives as long as the body; a disconnect drops both.
    let stream = ReceiverStream::new(outputs).map(move |output| {
        let _guard = &guard;
        Ok::<Event, Infallible>(sse_event(output))
    });

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("keep-alive"),
        )
        .into_response()
}

async fn buffered_response(handle: RelayHandle) -> Result<Response, BridgeError> {
    let RelayHandle { mut outputs, guard } = handle;
    let output = outputs.recv().await;
    drop(guard);

    match output {
        Some(Output::Completion(completion)) => Ok(Json(completion).into_response()),
        Some(Output::Failure(err)) => Err(err),
        Some(Output::Chunk(_) | Output::Done) | None => {
            Err(BridgeError::ProcessFailed { code: None })
        }
    }
}

fn sse_event(output: Output) -> Event {
    match output {
        Output::Chunk(chunk) => framer::chunk_event(&chunk),
        Output::Done => framer::done_event(),
        Output::Failure(err) => framer::error_event(&err),
        Output::Completion(completion) => {
            Event::default().data(serde_json::to_string(&completion).unwrap_or_default())
        }
    }
}

fn authorize(headers: &HeaderMap, token: &str) -> Result<(), BridgeError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(BridgeError::MissingAuthorization)?;
    let value = header.to_str().map_err(|_| BridgeError::InvalidApiKey)?;
    let presented = value.strip_prefix("Bearer ").unwrap_or(value);

    if presented == token {
        Ok(())
    } else {
        tracing::warn!("rejecting request with an invalid API key");
        Err(BridgeError::InvalidApiKey)
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
