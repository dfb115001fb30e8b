use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of a proposal draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropostaStatus {
    Rascunho,
    EmRedacao,
    Revisao,
    Submetida,
    Aprovada,
    Rejeitada,
}

impl PropostaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropostaStatus::Rascunho => "rascunho",
            PropostaStatus::EmRedacao => "em_redacao",
            PropostaStatus::Revisao => "revisao",
            PropostaStatus::Submetida => "submetida",
            PropostaStatus::Aprovada => "aprovada",
            PropostaStatus::Rejeitada => "rejeitada",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PropostaStatus::Aprovada | PropostaStatus::Rejeitada)
    }

    /// Forward moves along the pipeline, plus review sending a draft back to writing.
    /// Staying in the same status is always allowed outside terminal states.
    pub fn can_transition_to(&self, next: PropostaStatus) -> bool {
        use PropostaStatus::*;
        if self.is_terminal() {
            return false;
        }
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Rascunho, EmRedacao)
                | (EmRedacao, Revisao)
                | (Revisao, EmRedacao)
                | (Revisao, Submetida)
                | (Submetida, Aprovada)
                | (Submetida, Rejeitada)
        )
    }

    /// Content can only change before submission.
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            PropostaStatus::Rascunho | PropostaStatus::EmRedacao | PropostaStatus::Revisao
        )
    }
}

impl fmt::Display for PropostaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropostaStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rascunho" => Ok(PropostaStatus::Rascunho),
            "em_redacao" => Ok(PropostaStatus::EmRedacao),
            "revisao" => Ok(PropostaStatus::Revisao),
            "submetida" => Ok(PropostaStatus::Submetida),
            "aprovada" => Ok(PropostaStatus::Aprovada),
            "rejeitada" => Ok(PropostaStatus::Rejeitada),
            other => Err(format!("unknown proposta status '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PropostaStatus::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(Rascunho.can_transition_to(EmRedacao));
        assert!(EmRedacao.can_transition_to(Revisao));
        assert!(Revisao.can_transition_to(Submetida));
        assert!(Submetida.can_transition_to(Aprovada));
        assert!(Submetida.can_transition_to(Rejeitada));
    }

    #[test]
    fn test_review_can_return_to_writing() {
        assert!(Revisao.can_transition_to(EmRedacao));
    }

    #[test]
    fn test_cannot_skip_review() {
        assert!(!EmRedacao.can_transition_to(Submetida));
        assert!(!Rascunho.can_transition_to(Aprovada));
    }

    #[test]
    fn test_terminal_states_are_frozen() {
        assert!(!Aprovada.can_transition_to(Aprovada));
        assert!(!Rejeitada.can_transition_to(EmRedacao));
    }

    #[test]
    fn test_same_status_is_noop() {
        assert!(EmRedacao.can_transition_to(EmRedacao));
    }

    #[test]
    fn test_wire_names_round_trip() {
        for status in [Rascunho, EmRedacao, Revisao, Submetida, Aprovada, Rejeitada] {
            assert_eq!(status.as_str().parse::<PropostaStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.as_str().to_string())
            );
        }
    }

    #[test]
    fn test_only_pre_submission_is_editable() {
        assert!(Revisao.is_editable());
        assert!(!Submetida.is_editable());
    }
}
