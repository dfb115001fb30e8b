use anyhow::Result;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::perfil::UserProfileRow;
use crate::perfil::PerfilValidado;

pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<UserProfileRow>> {
    Ok(
        sqlx::query_as::<_, UserProfileRow>("SELECT * FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?,
    )
}

/// Inserts or replaces the profile of `user_id`; `created_at` survives updates.
pub async fn upsert_profile(
    pool: &PgPool,
    user_id: Uuid,
    perfil: &PerfilValidado,
) -> Result<UserProfileRow> {
    let row = sqlx::query_as::<_, UserProfileRow>(
        r#"
        INSERT INTO user_profiles
            (user_id, user_type, nome, cpf, cnpj, lattes_id, instituicao, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
        ON CONFLICT (user_id) DO UPDATE SET
            user_type = EXCLUDED.user_type,
            nome = EXCLUDED.nome,
            cpf = EXCLUDED.cpf,
            cnpj = EXCLUDED.cnpj,
            lattes_id = EXCLUDED.lattes_id,
            instituicao = EXCLUDED.instituicao,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(perfil.user_type.as_str())
    .bind(&perfil.nome)
    .bind(&perfil.cpf)
    .bind(&perfil.cnpj)
    .bind(&perfil.lattes_id)
    .bind(&perfil.instituicao)
    .fetch_one(pool)
    .await?;

    info!("Saved profile for user {user_id} as {}", perfil.user_type);
    Ok(row)
}
