use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PropostaRow {
    pub id: Uuid,
    pub edital_id: Uuid,
    pub user_id: Uuid,
    pub titulo: Option<String>,
    /// One of the `PropostaStatus` wire names.
    pub status: String,
    /// 0..=100, derived from `campos_formulario` on every write.
    pub progresso: i32,
    pub campos_formulario: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
