use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::AuthUser;
use shared_models::pagination::Pagination;

use crate::models::{
    ChatStatus, CreateChatRequest, SendMessageRequest, SupportChat, SupportError, SupportMessage,
};

const CHATS: &str = "support_chats";
const MESSAGES: &str = "support_messages";

/// Chat row with its creator's name.
const CHAT_SELECT: &str = "*,patient_user:users!patient_user_id(full_name,phone_number)";
/// Message row with its sender's name.
const MESSAGE_SELECT: &str = "*,sender:users!sender_user_id(full_name,phone_number)";

pub struct SupportService {
    supabase: SupabaseClient,
}

impl SupportService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_chat(&self, user: &AuthUser, request: CreateChatRequest) -> Result<SupportChat, SupportError> {
        request.validate()?;

        let now = Utc::now();
        let row = json!({
            "patient_user_id": user.id,
            "subject": request.subject.trim(),
            "status": ChatStatus::Open,
            "created_at": now,
            "updated_at": now,
        });

        let chat: SupportChat = self.supabase.insert_selecting(CHATS, CHAT_SELECT, row).await?;
        info!("Support chat {} opened by user {}", chat.id, user.id);
        Ok(chat)
    }

    /// Staff see every chat, patients only the ones they opened.
    pub async fn list_chats(&self, user: &AuthUser, pagination: Pagination) -> Result<Vec<SupportChat>, SupportError> {
        let mut query = format!("select={}&order=created_at.desc&{}", CHAT_SELECT, pagination.to_query());
        if !user.is_staff() {
            query.push_str(&format!("&patient_user_id=eq.{}", user.id));
        }
        Ok(self.supabase.select(CHATS, &query).await?)
    }

    /// The chat header if `user` may take part in it.
    pub async fn authorize(&self, user: &AuthUser, chat_id: i64) -> Result<SupportChat, SupportError> {
        let query = format!("select={}&id=eq.{}", CHAT_SELECT, chat_id);
        let chat: SupportChat = self
            .supabase
            .select_one(CHATS, &query)
            .await?
            .ok_or(SupportError::ChatNotFound)?;
        check_access(user, &chat)?;
        Ok(chat)
    }

    /// The chat with its messages oldest first.
    pub async fn get_chat(&self, user: &AuthUser, chat_id: i64) -> Result<SupportChat, SupportError> {
        let query = format!(
            "select={},messages:{}({})&id=eq.{}&messages.order=created_at.asc",
            CHAT_SELECT, MESSAGES, MESSAGE_SELECT, chat_id
        );
        let chat: SupportChat = self
            .supabase
            .select_one(CHATS, &query)
            .await?
            .ok_or(SupportError::ChatNotFound)?;
        check_access(user, &chat)?;
        Ok(chat)
    }

    pub async fn send_message(&self, user: &AuthUser, request: SendMessageRequest) -> Result<SupportMessage, SupportError> {
        request.validate()?;
        self.authorize(user, request.chat_id).await?;

        let row = json!({
            "chat_id": request.chat_id,
            "sender_user_id": user.id,
            "message": request.message,
            "is_read": false,
            "created_at": Utc::now(),
        });

        let message: SupportMessage = self.supabase.insert_selecting(MESSAGES, MESSAGE_SELECT, row).await?;
        debug!("Message {} stored on chat {}", message.id, message.chat_id);
        Ok(message)
    }

    pub async fn close_chat(&self, chat_id: i64) -> Result<SupportChat, SupportError> {
        let patch = json!({
            "status": ChatStatus::Closed,
            "updated_at": Utc::now(),
        });
        let filter = format!("id=eq.{}&select={}", chat_id, CHAT_SELECT);
        let updated: Vec<SupportChat> = self.supabase.update(CHATS, &filter, patch).await?;

        let chat = updated.into_iter().next().ok_or(SupportError::ChatNotFound)?;
        info!("Support chat {} closed", chat.id);
        Ok(chat)
    }
}

fn check_access(user: &AuthUser, chat: &SupportChat) -> Result<(), SupportError> {
    if user.is_patient() && !chat.is_owned_by(user.id) {
        warn!("User {} denied access to chat {}", user.id, chat.id);
        return Err(SupportError::AccessDenied);
    }
    Ok(())
}
