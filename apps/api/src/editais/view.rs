use chrono::NaiveDate;
use serde::Serialize;

use crate::editais::campo::CampoFormatado;
use crate::editais::elegibilidade::is_elegivel;
use crate::editais::prazo::format_prazo_inscricao;
use crate::editais::status::{fase_atual, is_edital_ativo};
use crate::editais::valor::format_valor_projeto;
use crate::models::edital::EditalRow;
use crate::models::perfil::UserType;

/// An edital as the dashboard consumes it: the stored row plus derived fields.
#[derive(Debug, Clone, Serialize)]
pub struct EditalView {
    #[serde(flatten)]
    pub edital: EditalRow,
    pub ativo: bool,
    pub fase_atual: Option<String>,
    pub valor: CampoFormatado,
    pub prazo: CampoFormatado,
    /// Present only when the request identified a user with a profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elegivel: Option<bool>,
}

impl EditalView {
    pub fn build(edital: EditalRow, today: NaiveDate, user_type: Option<UserType>) -> Self {
        Self {
            ativo: is_edital_ativo(&edital, today),
            fase_atual: fase_atual(&edital, today),
            valor: format_valor_projeto(edital.valor_projeto.as_ref()),
            prazo: format_prazo_inscricao(edital.prazo_inscricao.as_ref()),
            elegivel: user_type.map(|t| is_elegivel(&edital, t)),
            edital,
        }
    }
}
