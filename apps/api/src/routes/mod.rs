pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ai::handlers as ai;
use crate::editais::handlers as editais;
use crate::perfil::handlers as perfil;
use crate::propostas::handlers as propostas;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // AI proxy
        .route(
            "/api/extract-edital-info",
            post(ai::handle_extract_edital_info),
        )
        .route("/api/generate-proposta", post(ai::handle_generate_proposta))
        // Editais
        .route("/api/v1/editais", get(editais::handle_list_editais))
        .route("/api/v1/editais/:id", get(editais::handle_get_edital))
        // Propostas
        .route(
            "/api/v1/propostas",
            get(propostas::handle_list_propostas).post(propostas::handle_create_proposta),
        )
        .route(
            "/api/v1/propostas/:id",
            get(propostas::handle_get_proposta)
                .patch(propostas::handle_update_proposta)
                .delete(propostas::handle_delete_proposta),
        )
        // Perfil
        .route(
            "/api/v1/perfil",
            get(perfil::handle_get_perfil).put(perfil::handle_put_perfil),
        )
        .with_state(state)
}
