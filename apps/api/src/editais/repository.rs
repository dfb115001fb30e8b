use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::edital::EditalRow;

/// Lists editais, newest first. `busca` matches titulo or orgao, case-insensitively.
pub async fn list_editais(pool: &PgPool, busca: Option<&str>) -> Result<Vec<EditalRow>> {
    let pattern = busca
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(|b| format!("%{}%", escape_like(b)));

    Ok(sqlx::query_as::<_, EditalRow>(
        r#"
        SELECT id, titulo, orgao, descricao, status, valor_projeto, prazo_inscricao,
               data_encerramento, timeline_estimada, is_researcher, is_company,
               arquivo_path, created_at
        FROM editais
        WHERE $1::text IS NULL OR titulo ILIKE $1 OR orgao ILIKE $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(pattern)
    .fetch_all(pool)
    .await?)
}

pub async fn get_edital(pool: &PgPool, id: Uuid) -> Result<Option<EditalRow>> {
    Ok(sqlx::query_as::<_, EditalRow>(
        r#"
        SELECT id, titulo, orgao, descricao, status, valor_projeto, prazo_inscricao,
               data_encerramento, timeline_estimada, is_researcher, is_company,
               arquivo_path, created_at
        FROM editais
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?)
}

/// Escapes LIKE wildcards so user search text matches literally.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("100%_edital"), "100\\%\\_edital");
    }
}
