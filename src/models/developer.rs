use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Developer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Developer joined with its user record, as listed to admins.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DeveloperProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub email: String,
    pub active_assignments: i64,
    pub created_at: DateTime<Utc>,
}
