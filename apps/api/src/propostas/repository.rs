use anyhow::Result;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::proposta::PropostaRow;
use crate::propostas::status::PropostaStatus;

pub async fn list_propostas(pool: &PgPool, user_id: Uuid) -> Result<Vec<PropostaRow>> {
    Ok(sqlx::query_as::<_, PropostaRow>(
        "SELECT * FROM propostas WHERE user_id = $1 ORDER BY updated_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_proposta(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Option<PropostaRow>> {
    Ok(sqlx::query_as::<_, PropostaRow>(
        "SELECT * FROM propostas WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

pub struct NovaProposta<'a> {
    pub user_id: Uuid,
    pub edital_id: Uuid,
    pub titulo: Option<&'a str>,
    pub campos_formulario: &'a Value,
    pub progresso: i32,
}

pub async fn insert_proposta(pool: &PgPool, nova: NovaProposta<'_>) -> Result<PropostaRow> {
    let row = sqlx::query_as::<_, PropostaRow>(
        r#"
        INSERT INTO propostas
            (id, edital_id, user_id, titulo, status, progresso, campos_formulario, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(nova.edital_id)
    .bind(nova.user_id)
    .bind(nova.titulo)
    .bind(PropostaStatus::Rascunho.as_str())
    .bind(nova.progresso)
    .bind(nova.campos_formulario)
    .fetch_one(pool)
    .await?;

    info!(
        "Created proposta {} for edital {} (user {})",
        row.id, row.edital_id, row.user_id
    );
    Ok(row)
}

/// Optimistic update: the row is written only if it still has the status and
/// `updated_at` the caller read. Any write in between, field edits included,
/// makes this one match zero rows.
const UPDATE_PROPOSTA_SQL: &str = r#"
    UPDATE propostas
    SET status = $1, campos_formulario = $2, progresso = $3, updated_at = NOW()
    WHERE id = $4 AND user_id = $5 AND status = $6 AND updated_at = $7
    RETURNING *
"#;

/// Writes status, fields and progress over the version in `atual`.
/// `None` means the row changed since it was read.
pub async fn update_proposta(
    pool: &PgPool,
    atual: &PropostaRow,
    status: PropostaStatus,
    campos_formulario: &Value,
    progresso: i32,
) -> Result<Option<PropostaRow>> {
    Ok(sqlx::query_as::<_, PropostaRow>(UPDATE_PROPOSTA_SQL)
        .bind(status.as_str())
        .bind(campos_formulario)
        .bind(progresso)
        .bind(atual.id)
        .bind(atual.user_id)
        .bind(&atual.status)
        .bind(atual.updated_at)
        .fetch_optional(pool)
        .await?)
}

/// Returns whether a row was deleted.
pub async fn delete_proposta(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM propostas WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
