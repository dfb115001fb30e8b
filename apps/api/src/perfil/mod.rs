// User profiles: who the user applies as and the document numbers that back it.

pub mod documentos;
pub mod handlers;
pub mod repository;

use serde::Deserialize;

use crate::errors::AppError;
use crate::models::perfil::UserType;
use documentos::{normalizar_cnpj, normalizar_cpf, normalizar_lattes};

/// Profile fields as submitted by the dashboard form.
#[derive(Debug, Clone, Deserialize)]
pub struct PerfilInput {
    pub user_type: UserType,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub cnpj: Option<String>,
    #[serde(default)]
    pub lattes_id: Option<String>,
    #[serde(default)]
    pub instituicao: Option<String>,
}

/// Profile fields after validation: documents reduced to digits, blanks dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerfilValidado {
    pub user_type: UserType,
    pub nome: Option<String>,
    pub cpf: Option<String>,
    pub cnpj: Option<String>,
    pub lattes_id: Option<String>,
    pub instituicao: Option<String>,
}

fn nao_vazio(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Checks document numbers and the documents each user type must provide:
/// researchers need a CPF, companies a CNPJ, `ambos` both.
pub fn validar_perfil(input: PerfilInput) -> Result<PerfilValidado, AppError> {
    let invalido = |e: documentos::DocumentoInvalido| {
        AppError::Validation(format!("{}: {}", e.campo, e.motivo))
    };

    let cpf = nao_vazio(input.cpf)
        .map(|c| normalizar_cpf(&c))
        .transpose()
        .map_err(invalido)?;
    let cnpj = nao_vazio(input.cnpj)
        .map(|c| normalizar_cnpj(&c))
        .transpose()
        .map_err(invalido)?;
    let lattes_id = nao_vazio(input.lattes_id)
        .map(|l| normalizar_lattes(&l))
        .transpose()
        .map_err(invalido)?;

    let precisa_cpf = matches!(input.user_type, UserType::Pesquisador | UserType::Ambos);
    let precisa_cnpj = matches!(input.user_type, UserType::PessoaEmpresa | UserType::Ambos);
    if precisa_cpf && cpf.is_none() {
        return Err(AppError::Validation(format!(
            "cpf is required for user type '{}'",
            input.user_type
        )));
    }
    if precisa_cnpj && cnpj.is_none() {
        return Err(AppError::Validation(format!(
            "cnpj is required for user type '{}'",
            input.user_type
        )));
    }

    Ok(PerfilValidado {
        user_type: input.user_type,
        nome: nao_vazio(input.nome),
        cpf,
        cnpj,
        lattes_id,
        instituicao: nao_vazio(input.instituicao),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(user_type: UserType) -> PerfilInput {
        PerfilInput {
            user_type,
            nome: Some("  Ana Souza ".into()),
            cpf: None,
            cnpj: None,
            lattes_id: None,
            instituicao: Some("".into()),
        }
    }

    #[test]
    fn test_researcher_requires_cpf() {
        let err = validar_perfil(input(UserType::Pesquisador)).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("cpf")));
    }

    #[test]
    fn test_researcher_profile_normalized() {
        let mut i = input(UserType::Pesquisador);
        i.cpf = Some("529.982.247-25".into());
        i.lattes_id = Some("http://lattes.cnpq.br/1234567890123456".into());
        let perfil = validar_perfil(i).unwrap();
        assert_eq!(perfil.cpf.as_deref(), Some("52998224725"));
        assert_eq!(perfil.lattes_id.as_deref(), Some("1234567890123456"));
        assert_eq!(perfil.nome.as_deref(), Some("Ana Souza"));
        assert_eq!(perfil.instituicao, None);
    }

    #[test]
    fn test_both_requires_cnpj_too() {
        let mut i = input(UserType::Ambos);
        i.cpf = Some("52998224725".into());
        let err = validar_perfil(i).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("cnpj")));
    }

    #[test]
    fn test_invalid_cnpj_reported() {
        let mut i = input(UserType::PessoaEmpresa);
        i.cnpj = Some("11.222.333/0001-00".into());
        let err = validar_perfil(i).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.starts_with("cnpj:")));
    }

    #[test]
    fn test_user_type_wire_names() {
        let parsed: PerfilInput =
            serde_json::from_str(r#"{"user_type": "pessoa-empresa", "cnpj": "11222333000181"}"#)
                .unwrap();
        assert_eq!(parsed.user_type, UserType::PessoaEmpresa);
        assert!(validar_perfil(parsed).is_ok());
    }
}
