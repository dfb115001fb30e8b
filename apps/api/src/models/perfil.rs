use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Who the account applies as. Stored as text in `user_profiles.user_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserType {
    #[serde(rename = "pesquisador")]
    Pesquisador,
    #[serde(rename = "pessoa-empresa")]
    PessoaEmpresa,
    #[serde(rename = "ambos")]
    Ambos,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Pesquisador => "pesquisador",
            UserType::PessoaEmpresa => "pessoa-empresa",
            UserType::Ambos => "ambos",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pesquisador" => Ok(UserType::Pesquisador),
            "pessoa-empresa" | "empresa" => Ok(UserType::PessoaEmpresa),
            "ambos" => Ok(UserType::Ambos),
            other => Err(format!("unknown user type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfileRow {
    pub user_id: Uuid,
    pub user_type: String,
    pub nome: Option<String>,
    pub cpf: Option<String>,
    pub cnpj: Option<String>,
    pub lattes_id: Option<String>,
    pub instituicao: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfileRow {
    /// Parsed user type; rows with an unknown value are treated as `None`.
    pub fn tipo(&self) -> Option<UserType> {
        self.user_type.parse().ok()
    }
}
