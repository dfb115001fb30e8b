use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::editais::dates::hoje;
use crate::editais::repository::{get_edital, list_editais};
use crate::editais::view::EditalView;
use crate::errors::AppError;
use crate::models::perfil::UserType;
use crate::perfil::repository::get_profile;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListEditaisQuery {
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub somente_ativos: bool,
    pub busca: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditalQuery {
    pub user_id: Option<Uuid>,
}

async fn user_type_of(state: &AppState, user_id: Option<Uuid>) -> Result<Option<UserType>, AppError> {
    let Some(user_id) = user_id else {
        return Ok(None);
    };
    let profile = get_profile(&state.db, user_id).await?;
    Ok(profile.and_then(|p| p.tipo()))
}

/// GET /api/v1/editais
///
/// With `user_id`, only editais the user is eligible for are returned.
pub async fn handle_list_editais(
    State(state): State<AppState>,
    Query(params): Query<ListEditaisQuery>,
) -> Result<Json<Vec<EditalView>>, AppError> {
    let user_type = user_type_of(&state, params.user_id).await?;
    let rows = list_editais(&state.db, params.busca.as_deref()).await?;
    let total = rows.len();
    let today = hoje();

    let views: Vec<EditalView> = rows
        .into_iter()
        .map(|row| EditalView::build(row, today, user_type))
        .filter(|v| v.elegivel.unwrap_or(true))
        .filter(|v| !params.somente_ativos || v.ativo)
        .collect();

    debug!("Listing {} of {} editais", views.len(), total);
    Ok(Json(views))
}

/// GET /api/v1/editais/:id
pub async fn handle_get_edital(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<EditalQuery>,
) -> Result<Json<EditalView>, AppError> {
    let edital = get_edital(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Edital {id} not found")))?;
    let user_type = user_type_of(&state, params.user_id).await?;
    Ok(Json(EditalView::build(edital, hoje(), user_type)))
}
