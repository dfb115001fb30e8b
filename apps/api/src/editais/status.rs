//! Activity resolution for editais.
//!
//! Precedence, first decisive rule wins:
//! 1. explicit `status` text
//! 2. `timeline_estimada.fases` (phase status, then phase date windows)
//! 3. `data_encerramento`
//! 4. `prazo_inscricao` end dates
//! 5. active by default

use chrono::NaiveDate;
use serde_json::Value;

use crate::editais::dates::{fold, parse_date};
use crate::editais::prazo::data_fim_inscricao;
use crate::models::edital::EditalRow;

const STATUS_ATIVOS: &[&str] = &[
    "ativo",
    "ativa",
    "aberto",
    "aberta",
    "em andamento",
    "inscricoes abertas",
    "vigente",
];

const STATUS_ENCERRADOS: &[&str] = &[
    "encerrado",
    "encerrada",
    "finalizado",
    "finalizada",
    "fechado",
    "fechada",
    "inativo",
    "inativa",
    "cancelado",
    "cancelada",
    "suspenso",
    "suspensa",
];

#[derive(Debug, Default)]
pub struct Timeline {
    pub fases: Vec<Fase>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Fase {
    pub nome: Option<String>,
    pub status: Option<String>,
    pub data_inicio: Option<String>,
    pub data_fim: Option<String>,
}

impl Fase {
    /// Reads one phase field by field; a field of an unexpected type is dropped
    /// without discarding the rest of the phase.
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let texto = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let nome = texto("nome").or_else(|| match obj.get("nome") {
            Some(n @ Value::Number(_)) => Some(n.to_string()),
            _ => None,
        });
        Some(Fase {
            nome,
            status: texto("status"),
            data_inicio: texto("data_inicio"),
            data_fim: texto("data_fim"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusTexto {
    Ativo,
    Encerrado,
    Indefinido,
}

fn classificar_status(raw: Option<&str>) -> StatusTexto {
    let Some(raw) = raw else {
        return StatusTexto::Indefinido;
    };
    let folded = fold(raw);
    if STATUS_ENCERRADOS.contains(&folded.as_str()) {
        StatusTexto::Encerrado
    } else if STATUS_ATIVOS.contains(&folded.as_str()) {
        StatusTexto::Ativo
    } else {
        StatusTexto::Indefinido
    }
}

/// Parses `timeline_estimada`: an object with `fases`, a bare list of phases,
/// or either one stored as JSON text. Phases that are not objects are skipped.
pub fn parse_timeline(value: Option<&Value>) -> Timeline {
    let decoded;
    let value = match value {
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(v) => {
                decoded = v;
                &decoded
            }
            Err(_) => return Timeline::default(),
        },
        Some(v) => v,
        None => return Timeline::default(),
    };
    let fases = match value {
        Value::Object(obj) => obj.get("fases").and_then(Value::as_array),
        Value::Array(items) => Some(items),
        _ => None,
    };
    Timeline {
        fases: fases
            .map(|items| items.iter().filter_map(Fase::from_value).collect())
            .unwrap_or_default(),
    }
}

/// Whether the edital should be shown as active on `today`.
pub fn is_edital_ativo(edital: &EditalRow, today: NaiveDate) -> bool {
    match classificar_status(edital.status.as_deref()) {
        StatusTexto::Ativo => return true,
        StatusTexto::Encerrado => return false,
        StatusTexto::Indefinido => {}
    }

    let timeline = parse_timeline(edital.timeline_estimada.as_ref());
    if let Some(decisao) = decidir_pela_timeline(&timeline, today) {
        return decisao;
    }

    if let Some(encerramento) = edital.data_encerramento.as_deref().and_then(parse_date) {
        return today <= encerramento;
    }

    if let Some(fim) = data_fim_inscricao(edital.prazo_inscricao.as_ref()) {
        return today <= fim;
    }

    true
}

/// Name of the phase whose window covers `today`, if the timeline has one.
pub fn fase_atual(edital: &EditalRow, today: NaiveDate) -> Option<String> {
    parse_timeline(edital.timeline_estimada.as_ref())
        .fases
        .into_iter()
        .find(|f| {
            let inicio = f.data_inicio.as_deref().and_then(parse_date);
            let fim = f.data_fim.as_deref().and_then(parse_date);
            matches!((inicio, fim), (Some(i), Some(e)) if i <= today && today <= e)
        })
        .and_then(|f| f.nome)
}

fn decidir_pela_timeline(timeline: &Timeline, today: NaiveDate) -> Option<bool> {
    if timeline.fases.is_empty() {
        return None;
    }

    if timeline
        .fases
        .iter()
        .any(|f| classificar_status(f.status.as_deref()) == StatusTexto::Ativo)
    {
        return Some(true);
    }

    let janelas: Vec<(Option<NaiveDate>, Option<NaiveDate>)> = timeline
        .fases
        .iter()
        .map(|f| {
            (
                f.data_inicio.as_deref().and_then(parse_date),
                f.data_fim.as_deref().and_then(parse_date),
            )
        })
        .collect();

    let em_curso = janelas.iter().any(|janela| match *janela {
        (Some(inicio), Some(fim)) => inicio <= today && today <= fim,
        _ => false,
    });
    if em_curso {
        return Some(true);
    }

    let fins: Vec<NaiveDate> = janelas.iter().filter_map(|(_, fim)| *fim).collect();
    if !fins.is_empty() && fins.iter().all(|fim| *fim < today) {
        return Some(false);
    }

    let futura = janelas.iter().any(|(inicio, fim)| {
        inicio.map(|d| d > today).unwrap_or(false) || fim.map(|d| d >= today).unwrap_or(false)
    });
    if futura {
        return Some(true);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn edital() -> EditalRow {
        EditalRow {
            id: Uuid::new_v4(),
            titulo: "Chamada Universal".into(),
            orgao: Some("CNPq".into()),
            descricao: None,
            status: None,
            valor_projeto: None,
            prazo_inscricao: None,
            data_encerramento: None,
            timeline_estimada: None,
            is_researcher: Some(true),
            is_company: Some(false),
            arquivo_path: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_all_phases_past_is_inactive() {
        let mut e = edital();
        e.timeline_estimada = Some(json!({
            "fases": [
                {"nome": "Inscrição", "status": "concluída", "data_inicio": "2025-01-01", "data_fim": "2025-02-01"},
                {"nome": "Resultado", "data_inicio": "2025-03-01", "data_fim": "2025-04-30"}
            ]
        }));
        assert!(!is_edital_ativo(&e, today()));
    }

    #[test]
    fn test_phase_covering_today_is_active() {
        let mut e = edital();
        e.timeline_estimada = Some(json!({
            "fases": [
                {"nome": "Inscrição", "data_inicio": "2025-06-01", "data_fim": "2025-06-30"}
            ]
        }));
        assert!(is_edital_ativo(&e, today()));
    }

    #[test]
    fn test_phase_window_bounds_are_inclusive() {
        let mut e = edital();
        e.timeline_estimada = Some(json!({
            "fases": [{"data_inicio": "2025-06-15", "data_fim": "2025-06-15"}]
        }));
        assert!(is_edital_ativo(&e, today()));
    }

    #[test]
    fn test_explicit_status_wins_over_timeline() {
        let mut e = edital();
        e.status = Some("Encerrado".into());
        e.timeline_estimada = Some(json!({
            "fases": [{"data_inicio": "2025-06-01", "data_fim": "2025-06-30"}]
        }));
        assert!(!is_edital_ativo(&e, today()));

        e.status = Some("Inscrições abertas".into());
        e.timeline_estimada = Some(json!({
            "fases": [{"data_inicio": "2024-01-01", "data_fim": "2024-02-01"}]
        }));
        assert!(is_edital_ativo(&e, today()));
    }

    #[test]
    fn test_active_phase_status_wins_over_past_dates() {
        let mut e = edital();
        e.timeline_estimada = Some(json!({
            "fases": [{"status": "em_andamento", "data_inicio": "2024-01-01", "data_fim": "2024-02-01"}]
        }));
        assert!(is_edital_ativo(&e, today()));
    }

    #[test]
    fn test_upcoming_phase_is_active() {
        let mut e = edital();
        e.timeline_estimada = Some(json!({
            "fases": [{"data_inicio": "2025-09-01", "data_fim": "2025-10-01"}]
        }));
        assert!(is_edital_ativo(&e, today()));
    }

    #[test]
    fn test_timeline_stored_as_text() {
        let mut e = edital();
        e.timeline_estimada = Some(json!(
            r#"{"fases":[{"data_inicio":"2024-01-01","data_fim":"2024-03-01"}]}"#
        ));
        assert!(!is_edital_ativo(&e, today()));
    }

    #[test]
    fn test_malformed_phase_does_not_hide_the_others() {
        let mut e = edital();
        e.timeline_estimada = Some(json!({
            "fases": [
                {"nome": "Inscrição", "data_inicio": "2024-01-01", "data_fim": "2024-02-01"},
                {"nome": "Análise", "data_inicio": "2024-03-01", "data_fim": "2024-04-01"},
                {"nome": 3, "data_inicio": 20240415, "data_fim": "2024-05-01"},
                "fase sem estrutura"
            ]
        }));
        let timeline = parse_timeline(e.timeline_estimada.as_ref());
        assert_eq!(timeline.fases.len(), 3);
        assert_eq!(
            timeline.fases[2],
            Fase {
                nome: Some("3".into()),
                status: None,
                data_inicio: None,
                data_fim: Some("2024-05-01".into()),
            }
        );
        assert!(!is_edital_ativo(&e, today()));
    }

    #[test]
    fn test_bare_phase_list() {
        let mut e = edital();
        e.timeline_estimada = Some(json!([{"data_inicio": "2025-06-01", "data_fim": "2025-06-30"}]));
        assert!(is_edital_ativo(&e, today()));
    }

    #[test]
    fn test_encerramento_date_decides_without_timeline() {
        let mut e = edital();
        e.data_encerramento = Some("14/06/2025".into());
        assert!(!is_edital_ativo(&e, today()));
        e.data_encerramento = Some("2025-06-15".into());
        assert!(is_edital_ativo(&e, today()));
    }

    #[test]
    fn test_prazo_variants_decide_last() {
        let mut e = edital();
        e.prazo_inscricao = Some(json!({"prazos": [{"fim": "2025-05-01"}]}));
        assert!(!is_edital_ativo(&e, today()));
        e.prazo_inscricao = Some(json!(r#"{"data_fim": "2025-07-01"}"#));
        assert!(is_edital_ativo(&e, today()));
    }

    #[test]
    fn test_current_phase_name() {
        let mut e = edital();
        e.timeline_estimada = Some(json!({
            "fases": [
                {"nome": "Inscrição", "data_inicio": "2025-05-01", "data_fim": "2025-05-31"},
                {"nome": "Análise", "data_inicio": "2025-06-01", "data_fim": "2025-07-31"}
            ]
        }));
        assert_eq!(fase_atual(&e, today()).as_deref(), Some("Análise"));
    }

    #[test]
    fn test_undated_edital_defaults_to_active() {
        let mut e = edital();
        e.prazo_inscricao = Some(json!("Fluxo contínuo"));
        assert!(is_edital_ativo(&e, today()));
    }

    #[test]
    fn test_unknown_status_falls_through() {
        let mut e = edital();
        e.status = Some("publicado".into());
        e.data_encerramento = Some("2025-01-01".into());
        assert!(!is_edital_ativo(&e, today()));
    }
}
