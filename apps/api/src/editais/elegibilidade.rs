use crate::models::edital::EditalRow;
use crate::models::perfil::UserType;

/// Whether a user of `user_type` may apply to the edital.
/// An edital that flags neither audience is open to everyone.
pub fn is_elegivel(edital: &EditalRow, user_type: UserType) -> bool {
    let pesquisador = edital.is_researcher.unwrap_or(false);
    let empresa = edital.is_company.unwrap_or(false);

    if edital.is_researcher.is_none() && edital.is_company.is_none() {
        return true;
    }

    match user_type {
        UserType::Pesquisador => pesquisador,
        UserType::PessoaEmpresa => empresa,
        UserType::Ambos => pesquisador || empresa,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn edital(is_researcher: Option<bool>, is_company: Option<bool>) -> EditalRow {
        EditalRow {
            id: Uuid::new_v4(),
            titulo: "Centelha".into(),
            orgao: Some("FINEP".into()),
            descricao: None,
            status: None,
            valor_projeto: None,
            prazo_inscricao: None,
            data_encerramento: None,
            timeline_estimada: None,
            is_researcher,
            is_company,
            arquivo_path: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_company_only_edital() {
        let e = edital(Some(false), Some(true));
        assert!(!is_elegivel(&e, UserType::Pesquisador));
        assert!(is_elegivel(&e, UserType::PessoaEmpresa));
        assert!(is_elegivel(&e, UserType::Ambos));
    }

    #[test]
    fn test_researcher_only_edital() {
        let e = edital(Some(true), None);
        assert!(is_elegivel(&e, UserType::Pesquisador));
        assert!(!is_elegivel(&e, UserType::PessoaEmpresa));
    }

    #[test]
    fn test_unflagged_edital_is_open() {
        let e = edital(None, None);
        assert!(is_elegivel(&e, UserType::Pesquisador));
        assert!(is_elegivel(&e, UserType::PessoaEmpresa));
    }

    #[test]
    fn test_both_flags_false_excludes_everyone() {
        let e = edital(Some(false), Some(false));
        assert!(!is_elegivel(&e, UserType::Ambos));
    }
}
