//! `prazo_inscricao` normalizer and end-date extraction.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::editais::campo::{classificar, compacto, escalar, primeiro, CampoFormatado, Entrada};
use crate::editais::dates::parse_date;

const ROTULOS: &[&str] = &["descricao", "fase", "nome", "etapa"];
const INICIOS: &[&str] = &["inicio", "data_inicio"];
const FINS: &[&str] = &["fim", "data_fim", "data_limite", "encerramento"];

/// Scalar text for deadlines: numbers are counts or days, never currency.
fn texto_prazo(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        other => escalar(other),
    }
}

/// Reduces a `prazo_inscricao` field to a display string plus one detail line per deadline.
pub fn format_prazo_inscricao(value: Option<&Value>) -> CampoFormatado {
    match classificar(value) {
        Entrada::NaoInformado => CampoFormatado::nao_informado(),
        Entrada::Texto(texto) => CampoFormatado::texto(texto),
        Entrada::Json(json) => {
            let (display, detalhes) = formatar_json(&json);
            CampoFormatado {
                display,
                raw: Some(json),
                detalhes,
            }
        }
    }
}

fn formatar_json(json: &Value) -> (String, Vec<String>) {
    match json {
        Value::Object(obj) => {
            if let Some(prazos) = obj.get("prazos").and_then(Value::as_array) {
                return formatar_lista(prazos, json);
            }
            if let Some(janela) = formatar_janela(obj) {
                return (janela, Vec::new());
            }
            if let Some(tipo) = obj.get("tipo").and_then(texto_prazo) {
                return (tipo, Vec::new());
            }
            (compacto(json), Vec::new())
        }
        Value::Array(items) => formatar_lista(items, json),
        other => (texto_prazo(other).unwrap_or_else(|| compacto(other)), Vec::new()),
    }
}

fn formatar_lista(prazos: &[Value], original: &Value) -> (String, Vec<String>) {
    let detalhes: Vec<String> = prazos
        .iter()
        .filter_map(|item| match item {
            Value::Object(obj) => formatar_janela(obj).or_else(|| obj.get("tipo").and_then(texto_prazo)),
            other => texto_prazo(other),
        })
        .collect();

    if detalhes.is_empty() {
        return (compacto(original), Vec::new());
    }
    (detalhes.join("; "), detalhes)
}

/// `"{rótulo}: De {inicio} · Até {fim}"` and its partial variants.
fn formatar_janela(obj: &Map<String, Value>) -> Option<String> {
    let inicio = primeiro(obj, INICIOS).and_then(texto_prazo);
    let fim = primeiro(obj, FINS).and_then(texto_prazo);

    let janela = match (inicio, fim) {
        (Some(i), Some(f)) => format!("De {i} · Até {f}"),
        (None, Some(f)) => format!("Até {f}"),
        (Some(i), None) => format!("A partir de {i}"),
        (None, None) => obj.get("data").and_then(texto_prazo)?,
    };

    Some(match primeiro(obj, ROTULOS).and_then(texto_prazo) {
        Some(rotulo) => format!("{rotulo}: {janela}"),
        None => janela,
    })
}

/// Latest registration end date found in any of the known shapes.
pub fn data_fim_inscricao(value: Option<&Value>) -> Option<NaiveDate> {
    match classificar(value) {
        Entrada::NaoInformado => None,
        Entrada::Texto(texto) => parse_date(&texto),
        Entrada::Json(json) => datas_fim(&json).into_iter().max(),
    }
}

fn datas_fim(json: &Value) -> Vec<NaiveDate> {
    match json {
        Value::String(s) => parse_date(s).into_iter().collect(),
        Value::Array(items) => items.iter().flat_map(datas_fim).collect(),
        Value::Object(obj) => {
            if let Some(prazos) = obj.get("prazos").and_then(Value::as_array) {
                return prazos.iter().flat_map(datas_fim).collect();
            }
            FINS.iter()
                .chain(std::iter::once(&"data"))
                .filter_map(|k| obj.get(*k).and_then(Value::as_str))
                .filter_map(parse_date)
                .collect()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_prazo_is_not_currency() {
        let formatted = format_prazo_inscricao(Some(&json!("30")));
        assert_eq!(formatted.display, "30");
        assert_eq!(data_fim_inscricao(Some(&json!("30"))), None);
    }

    #[test]
    fn test_prazos_list_with_end_date() {
        let input = json!(r#"{"prazos":[{"fim":"2025-12-10"}]}"#);
        let formatted = format_prazo_inscricao(Some(&input));
        assert!(formatted.display.contains("Até 2025-12-10"));
        assert_eq!(formatted.detalhes, vec!["Até 2025-12-10"]);
    }

    #[test]
    fn test_prazos_with_labels_and_windows() {
        let input = json!({
            "prazos": [
                {"fase": "Submissão", "inicio": "2025-01-10", "fim": "2025-02-28"},
                {"fase": "Recurso", "data": "2025-04-15"}
            ]
        });
        let formatted = format_prazo_inscricao(Some(&input));
        assert_eq!(
            formatted.detalhes,
            vec![
                "Submissão: De 2025-01-10 · Até 2025-02-28",
                "Recurso: 2025-04-15"
            ]
        );
        assert_eq!(formatted.display, formatted.detalhes.join("; "));
    }

    #[test]
    fn test_single_window_object() {
        let input = json!({"data_fim": "30/06/2025"});
        assert_eq!(format_prazo_inscricao(Some(&input)).display, "Até 30/06/2025");
    }

    #[test]
    fn test_continuous_flow() {
        let input = json!({"tipo": "Fluxo contínuo"});
        assert_eq!(format_prazo_inscricao(Some(&input)).display, "Fluxo contínuo");
    }

    #[test]
    fn test_plain_text_passes_through() {
        let input = json!("Até 15 de março");
        let formatted = format_prazo_inscricao(Some(&input));
        assert_eq!(formatted.display, "Até 15 de março");
        assert!(formatted.raw.is_none());
    }

    #[test]
    fn test_not_informed() {
        assert_eq!(format_prazo_inscricao(None).display, "Não informado");
    }

    #[test]
    fn test_latest_end_date_across_prazos() {
        let input = json!({"prazos": [{"fim": "2025-02-28"}, {"fim": "2025-05-31"}, {"inicio": "2025-01-01"}]});
        assert_eq!(
            data_fim_inscricao(Some(&input)),
            NaiveDate::from_ymd_opt(2025, 5, 31)
        );
    }

    #[test]
    fn test_end_date_from_plain_string() {
        assert_eq!(
            data_fim_inscricao(Some(&json!("2026-01-15"))),
            NaiveDate::from_ymd_opt(2026, 1, 15)
        );
    }
}
