use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_database::DatabaseError;
use shared_models::embed::EmbeddedUser;
use shared_models::error::AppError;

pub const MAX_SUBJECT_LENGTH: usize = 255;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ChatStatus {
    #[default]
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportMessage {
    pub id: i64,
    pub chat_id: i64,
    pub sender_user_id: i64,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub sender: Option<EmbeddedUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportChat {
    pub id: i64,
    pub patient_user_id: i64,
    pub subject: String,
    #[serde(default)]
    pub status: ChatStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub patient_user: Option<EmbeddedUser>,
    #[serde(default, skip_serializing)]
    pub messages: Vec<SupportMessage>,
}

impl SupportChat {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.patient_user_id == user_id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    #[serde(flatten)]
    pub message: SupportMessage,
    pub sender_name: Option<String>,
}

impl From<SupportMessage> for MessageResponse {
    fn from(message: SupportMessage) -> Self {
        let sender_name = message.sender.as_ref().map(|u| u.full_name.clone());
        Self { message, sender_name }
    }
}

/// A chat with its patient's name and, when loaded, its messages oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    #[serde(flatten)]
    pub chat: SupportChat,
    pub patient_name: Option<String>,
    pub messages: Vec<MessageResponse>,
}

impl From<SupportChat> for ChatResponse {
    fn from(mut chat: SupportChat) -> Self {
        let patient_name = chat.patient_user.as_ref().map(|u| u.full_name.clone());
        let messages = std::mem::take(&mut chat.messages)
            .into_iter()
            .map(MessageResponse::from)
            .collect();
        Self { chat, patient_name, messages }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChatRequest {
    pub subject: String,
}

impl CreateChatRequest {
    pub fn validate(&self) -> Result<(), SupportError> {
        let subject = self.subject.trim();
        if subject.is_empty() {
            return Err(SupportError::ValidationError("Subject must not be empty".to_string()));
        }
        if subject.chars().count() > MAX_SUBJECT_LENGTH {
            return Err(SupportError::ValidationError(format!(
                "Subject must be at most {} characters",
                MAX_SUBJECT_LENGTH
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    pub message: String,
}

impl SendMessageRequest {
    pub fn validate(&self) -> Result<(), SupportError> {
        if self.message.trim().is_empty() {
            return Err(SupportError::ValidationError("Message must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Query string of the chat socket. Browsers cannot set headers on an upgrade.
#[derive(Debug, Deserialize)]
pub struct SocketQuery {
    pub token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SupportError {
    #[error("Chat not found")]
    ChatNotFound,

    #[error("Access denied to this chat")]
    AccessDenied,

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<SupportError> for AppError {
    fn from(err: SupportError) -> Self {
        match err {
            SupportError::ChatNotFound => AppError::NotFound(err.to_string()),
            SupportError::AccessDenied => AppError::Forbidden(err.to_string()),
            SupportError::ValidationError(msg) => AppError::ValidationError(msg),
            SupportError::Database(db) => db.into(),
        }
    }
}
