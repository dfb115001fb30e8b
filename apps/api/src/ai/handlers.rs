//! Axum route handlers for the AI proxy endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::ai::extract::{self, EditalExtraido};
use crate::ai::pipeline::{estimate_text_tokens, generate_json, prepare_files, validate_file_ids};
use crate::ai::proposta::{self, PropostaGerada};
use crate::editais::repository::get_edital;
use crate::errors::AppError;
use crate::gemini::{Part, UsageMetadata};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExtractEditalRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub file_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractEditalResponse {
    #[serde(flatten)]
    pub edital: EditalExtraido,
    pub usage: UsageMetadata,
}

#[derive(Debug, Deserialize)]
pub struct GeneratePropostaRequest {
    pub edital_id: Uuid,
    #[serde(default)]
    pub edital_info: Value,
    #[serde(default)]
    pub file_ids: Vec<String>,
    #[serde(default)]
    pub user_context: Value,
}

#[derive(Debug, Serialize)]
pub struct GeneratePropostaResponse {
    #[serde(flatten)]
    pub proposta: PropostaGerada,
    pub usage: UsageMetadata,
}

fn sem_conteudo(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/extract-edital-info
///
/// Reads the uploaded edital documents and returns their structured fields.
pub async fn handle_extract_edital_info(
    State(state): State<AppState>,
    Json(req): Json<ExtractEditalRequest>,
) -> Result<Json<ExtractEditalResponse>, AppError> {
    if req.message.trim().is_empty() && req.file_ids.is_empty() {
        return Err(AppError::Validation(
            "message or file_ids must be provided".to_string(),
        ));
    }
    validate_file_ids(&req.file_ids)?;

    info!("Extracting edital info from {} file(s)", req.file_ids.len());
    let prepared = prepare_files(&state, &req.file_ids).await?;

    let prompt = extract::build_prompt(&req.message);
    let estimated = prepared.estimated_tokens + estimate_text_tokens(&prompt);
    let mut parts = prepared.parts;
    parts.push(Part::text(prompt));

    let (resposta, usage) = generate_json::<Value>(
        &state,
        &parts,
        &extract::system_instruction(),
        estimated,
        "Edital extraction failed",
    )
    .await?;

    let edital = extract::normalizar_extracao(resposta)?;
    info!(
        "Edital extracted ({} tokens, valor: {})",
        usage.total_token_count, edital.valor.display
    );
    Ok(Json(ExtractEditalResponse { edital, usage }))
}

/// POST /api/generate-proposta
///
/// Drafts every form field for an edital. Missing `edital_info` and `file_ids`
/// fall back to the stored edital row and its PDF.
pub async fn handle_generate_proposta(
    State(state): State<AppState>,
    Json(req): Json<GeneratePropostaRequest>,
) -> Result<Json<GeneratePropostaResponse>, AppError> {
    validate_file_ids(&req.file_ids)?;

    let stored = get_edital(&state.db, req.edital_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Edital {} not found", req.edital_id)))?;

    let edital_info = if sem_conteudo(&req.edital_info) {
        serde_json::to_value(&stored).map_err(|e| AppError::Internal(e.into()))?
    } else {
        req.edital_info.clone()
    };
    let file_ids = if req.file_ids.is_empty() {
        stored.arquivo_path.iter().cloned().collect::<Vec<_>>()
    } else {
        req.file_ids.clone()
    };

    let schema = proposta::schema_do_edital(&req.edital_info, &stored);
    info!(
        "Generating proposta for edital {} ({:?} schema, {} file(s))",
        stored.id,
        schema.kind,
        file_ids.len()
    );

    let prepared = prepare_files(&state, &file_ids).await?;
    let prompt = proposta::build_prompt(schema, &edital_info, &req.user_context);
    let estimated = prepared.estimated_tokens + estimate_text_tokens(&prompt);
    let mut parts = prepared.parts;
    parts.push(Part::text(prompt));

    let (resposta, usage) = generate_json::<Value>(
        &state,
        &parts,
        &proposta::system_instruction(),
        estimated,
        "Proposal generation failed",
    )
    .await?;

    let proposta = proposta::montar_resultado(schema, &resposta);
    info!(
        "Proposta drafted for edital {} ({}% of required fields)",
        stored.id, proposta.progresso
    );
    Ok(Json(GeneratePropostaResponse { proposta, usage }))
}
