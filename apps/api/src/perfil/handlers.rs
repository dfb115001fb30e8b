use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::perfil::UserProfileRow;
use crate::perfil::repository::{get_profile, upsert_profile};
use crate::perfil::{validar_perfil, PerfilInput};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct SalvarPerfilRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub perfil: PerfilInput,
}

/// GET /api/v1/perfil
pub async fn handle_get_perfil(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<UserProfileRow>, AppError> {
    let profile = get_profile(&state.db, params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile for user {} not found", params.user_id)))?;
    Ok(Json(profile))
}

/// PUT /api/v1/perfil
pub async fn handle_put_perfil(
    State(state): State<AppState>,
    Json(req): Json<SalvarPerfilRequest>,
) -> Result<Json<UserProfileRow>, AppError> {
    let perfil = validar_perfil(req.perfil)?;
    let saved = upsert_profile(&state.db, req.user_id, &perfil).await?;
    Ok(Json(saved))
}
