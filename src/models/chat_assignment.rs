use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ChatAssignment {
    pub id: Uuid,
    pub developer_id: Uuid,
    pub chat_id: String,
    pub chat_name: Option<String>,
    pub session_id: String,
    pub assigned_at: DateTime<Utc>,
    pub is_active: bool,
    pub unassigned_at: Option<DateTime<Utc>>,
    pub last_message_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AssignmentWithDeveloper {
    pub id: Uuid,
    pub developer_id: Uuid,
    pub developer_name: String,
    pub developer_email: String,
    pub chat_id: String,
    pub chat_name: Option<String>,
    pub session_id: String,
    pub assigned_at: DateTime<Utc>,
    pub is_active: bool,
    pub unassigned_at: Option<DateTime<Utc>>,
    pub last_message_at: Option<DateTime<Utc>>,
}
