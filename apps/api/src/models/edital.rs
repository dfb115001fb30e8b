use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A funding call as stored by the BaaS. Several columns are loosely typed:
/// `valor_projeto`, `prazo_inscricao` and `timeline_estimada` hold whatever shape
/// the import produced.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EditalRow {
    pub id: Uuid,
    pub titulo: String,
    pub orgao: Option<String>,
    pub descricao: Option<String>,
    pub status: Option<String>,
    pub valor_projeto: Option<Value>,
    pub prazo_inscricao: Option<Value>,
    pub data_encerramento: Option<String>,
    pub timeline_estimada: Option<Value>,
    pub is_researcher: Option<bool>,
    pub is_company: Option<bool>,
    /// Object-storage key of the edital PDF.
    pub arquivo_path: Option<String>,
    pub created_at: DateTime<Utc>,
}
