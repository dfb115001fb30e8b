//! Axum route handlers for proposal drafts.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::editais::repository::get_edital;
use crate::errors::AppError;
use crate::models::proposta::PropostaRow;
use crate::propostas::forms::{
    calcular_progresso, mesclar_campos, schema_para, validar_campos, FormSchema,
};
use crate::propostas::repository::{
    delete_proposta, get_proposta, insert_proposta, list_propostas, update_proposta,
    NovaProposta,
};
use crate::propostas::status::PropostaStatus;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CriarPropostaRequest {
    pub user_id: Uuid,
    pub edital_id: Uuid,
    pub titulo: Option<String>,
    /// Optional starting content, e.g. a draft from `generate-proposta`.
    pub campos_formulario: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct AtualizarPropostaRequest {
    pub user_id: Uuid,
    pub status: Option<PropostaStatus>,
    pub campos_formulario: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct PropostaDetalhe {
    #[serde(flatten)]
    pub proposta: PropostaRow,
    pub schema: &'static FormSchema,
}

async fn schema_da_proposta(state: &AppState, edital_id: Uuid) -> Result<&'static FormSchema, AppError> {
    let edital = get_edital(&state.db, edital_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Edital {edital_id} not found")))?;
    Ok(schema_para(edital.orgao.as_deref(), Some(&edital.titulo)))
}

fn status_atual(row: &PropostaRow) -> Result<PropostaStatus, AppError> {
    row.status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!("proposta {}: {e}", row.id)))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/propostas
pub async fn handle_list_propostas(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<PropostaRow>>, AppError> {
    Ok(Json(list_propostas(&state.db, params.user_id).await?))
}

/// POST /api/v1/propostas
///
/// Starts a draft for an edital with the form layout its funder uses.
pub async fn handle_create_proposta(
    State(state): State<AppState>,
    Json(req): Json<CriarPropostaRequest>,
) -> Result<(StatusCode, Json<PropostaDetalhe>), AppError> {
    let schema = schema_da_proposta(&state, req.edital_id).await?;

    let campos = match &req.campos_formulario {
        Some(iniciais) => {
            validar_campos(schema, iniciais).map_err(AppError::Validation)?;
            mesclar_campos(&schema.campos_vazios(), iniciais)
        }
        None => schema.campos_vazios(),
    };
    let progresso = calcular_progresso(schema, &campos);

    let proposta = insert_proposta(
        &state.db,
        NovaProposta {
            user_id: req.user_id,
            edital_id: req.edital_id,
            titulo: req.titulo.as_deref(),
            campos_formulario: &campos,
            progresso,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(PropostaDetalhe { proposta, schema })))
}

/// GET /api/v1/propostas/:id
pub async fn handle_get_proposta(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<PropostaDetalhe>, AppError> {
    let proposta = get_proposta(&state.db, id, params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Proposta {id} not found")))?;
    let schema = schema_da_proposta(&state, proposta.edital_id).await?;
    Ok(Json(PropostaDetalhe { proposta, schema }))
}

/// PATCH /api/v1/propostas/:id
///
/// Applies a status transition and/or field edits, then recomputes progress.
pub async fn handle_update_proposta(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AtualizarPropostaRequest>,
) -> Result<Json<PropostaDetalhe>, AppError> {
    let atual = get_proposta(&state.db, id, req.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Proposta {id} not found")))?;
    let status = status_atual(&atual)?;
    let schema = schema_da_proposta(&state, atual.edital_id).await?;

    let campos = match &req.campos_formulario {
        Some(alteracoes) => {
            if !status.is_editable() {
                return Err(AppError::Conflict(format!(
                    "Proposta {id} is '{status}' and can no longer be edited"
                )));
            }
            validar_campos(schema, alteracoes).map_err(AppError::Validation)?;
            mesclar_campos(&atual.campos_formulario, alteracoes)
        }
        None => atual.campos_formulario.clone(),
    };

    let novo_status = req.status.unwrap_or(status);
    if !status.can_transition_to(novo_status) {
        return Err(AppError::Conflict(format!(
            "Cannot move proposta {id} from '{status}' to '{novo_status}'"
        )));
    }

    let progresso = calcular_progresso(schema, &campos);
    let proposta = update_proposta(&state.db, &atual, novo_status, &campos, progresso)
        .await?
        .ok_or_else(|| {
            AppError::Conflict(format!("Proposta {id} changed concurrently, reload and retry"))
        })?;

    Ok(Json(PropostaDetalhe { proposta, schema }))
}

/// DELETE /api/v1/propostas/:id
pub async fn handle_delete_proposta(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    if delete_proposta(&state.db, id, params.user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Proposta {id} not found")))
    }
}
