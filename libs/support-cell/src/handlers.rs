use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, Path, Query, State,
    },
    http::StatusCode,
    response::Response,
    Json,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_models::auth::{AuthUser, TokenType};
use shared_models::error::AppError;
use shared_models::pagination::Pagination;
use shared_utils::jwt::validate_token;

use crate::models::{ChatResponse, CreateChatRequest, MessageResponse, SendMessageRequest, SocketQuery};
use crate::services::relay::LISTENER_BUFFER;
use crate::services::{ChatRelay, SupportService};

#[derive(Clone)]
pub struct SupportState {
    pub config: Arc<AppConfig>,
    pub relay: Arc<ChatRelay>,
}

impl SupportState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            relay: Arc::new(ChatRelay::new()),
        }
    }
}

#[axum::debug_handler]
pub async fn create_chat(
    State(state): State<SupportState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<ChatResponse>), AppError> {
    let service = SupportService::new(&state.config);

    let chat = service.create_chat(&user, request).await?;
    Ok((StatusCode::CREATED, Json(chat.into())))
}

#[axum::debug_handler]
pub async fn list_chats(
    State(state): State<SupportState>,
    Extension(user): Extension<AuthUser>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<ChatResponse>>, AppError> {
    let service = SupportService::new(&state.config);

    let chats = service.list_chats(&user, pagination).await?;
    Ok(Json(chats.into_iter().map(Into::into).collect()))
}

#[axum::debug_handler]
pub async fn get_chat(
    State(state): State<SupportState>,
    Extension(user): Extension<AuthUser>,
    Path(chat_id): Path<i64>,
) -> Result<Json<ChatResponse>, AppError> {
    let service = SupportService::new(&state.config);

    let chat = service.get_chat(&user, chat_id).await?;
    Ok(Json(chat.into()))
}

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<SupportState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let service = SupportService::new(&state.config);

    let message = service.send_message(&user, request).await?;
    if state.relay.send(message.chat_id, message.message.clone()).await {
        debug!("Message {} relayed to chat {}", message.id, message.chat_id);
    }
    Ok((StatusCode::CREATED, Json(message.into())))
}

#[axum::debug_handler]
pub async fn close_chat(
    State(state): State<SupportState>,
    Extension(user): Extension<AuthUser>,
    Path(chat_id): Path<i64>,
) -> Result<Json<ChatResponse>, AppError> {
    user.require_staff()?;
    let service = SupportService::new(&state.config);

    let chat = service.close_chat(chat_id).await?;
    Ok(Json(chat.into()))
}

/// Upgrades to the chat's live socket. The access token travels in the query string.
#[axum::debug_handler]
pub async fn chat_socket(
    State(state): State<SupportState>,
    Path(chat_id): Path<i64>,
    Query(query): Query<SocketQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let user = validate_token(&query.token, &state.config.jwt_secret, TokenType::Access).map_err(AppError::Auth)?;
    SupportService::new(&state.config).authorize(&user, chat_id).await?;

    info!("User {} connecting to chat {}", user.id, chat_id);
    let relay = state.relay.clone();
    Ok(ws.on_upgrade(move |socket| relay_socket(socket, relay, chat_id)))
}

async fn relay_socket(socket: WebSocket, relay: Arc<ChatRelay>, chat_id: i64) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(LISTENER_BUFFER);
    let connection = relay.register(chat_id, tx).await;

    // Ends once the relay drops our sender: on unregister or when replaced.
    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                relay.send(chat_id, format!("Echo: {}", text.as_str())).await;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    relay.unregister(chat_id, connection).await;
    let _ = writer.await;
    debug!("Connection {} on chat {} closed", connection, chat_id);
}
