//! Shared plumbing for the edital field normalizers (`valor`, `prazo`).
//!
//! Both fields arrive in whatever shape the edital was imported with: SQL null,
//! a plain string, a JSON document encoded inside a string, or a JSON object.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NAO_INFORMADO: &str = "Não informado";

/// Display-ready rendering of a loosely-typed edital field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampoFormatado {
    pub display: String,
    /// The structured value the display was derived from, when there was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detalhes: Vec<String>,
}

impl CampoFormatado {
    pub fn nao_informado() -> Self {
        Self::texto(NAO_INFORMADO)
    }

    pub fn texto(display: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            raw: None,
            detalhes: Vec::new(),
        }
    }
}

/// Outcome of sniffing a field's shape.
pub enum Entrada {
    NaoInformado,
    /// A string that is not JSON; shown exactly as stored.
    Texto(String),
    /// Structured JSON, either stored as such or decoded from a string.
    Json(Value),
}

pub fn classificar(value: Option<&Value>) -> Entrada {
    match value {
        None | Some(Value::Null) => Entrada::NaoInformado,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NAO_INFORMADO) {
                return Entrada::NaoInformado;
            }
            match decode_embedded_json(trimmed) {
                Some(Value::Null) => Entrada::NaoInformado,
                Some(decoded) => Entrada::Json(decoded),
                None => Entrada::Texto(s.clone()),
            }
        }
        Some(other) => Entrada::Json(other.clone()),
    }
}

/// Decodes a string holding an encoded object, array, string or number.
/// Other text, `"true"` included, stays as it was stored.
fn decode_embedded_json(s: &str) -> Option<Value> {
    let looks_encoded = s.starts_with('{') || s.starts_with('[') || s.starts_with('"');
    if !looks_encoded {
        return serde_json::from_str::<serde_json::Number>(s)
            .ok()
            .map(Value::Number);
    }
    let decoded: Value = serde_json::from_str(s).ok()?;
    match decoded {
        // A doubly-encoded string may itself hold a document.
        Value::String(inner) => Some(decode_embedded_json(inner.trim()).unwrap_or(Value::String(inner))),
        other => Some(other),
    }
}

/// Text of a scalar the way the dashboard shows it: strings verbatim, numbers as BRL.
pub fn escalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => n.as_f64().map(format_brl),
        Value::Bool(b) => Some(if *b { "Sim" } else { "Não" }.to_string()),
        _ => None,
    }
}

/// First present, non-empty scalar among `keys`.
pub fn primeiro<'a>(obj: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| escalar(v).is_some())
}

pub fn compacto(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Formats an amount as Brazilian reais: `R$ 1.234.567,89`, cents omitted when zero.
pub fn format_brl(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents_total = (amount.abs() * 100.0).round() as u64;
    let inteiro = cents_total / 100;
    let centavos = cents_total % 100;

    let digits = inteiro.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sinal = if negative { "-" } else { "" };
    if centavos == 0 {
        format!("{sinal}R$ {grouped}")
    } else {
        format!("{sinal}R$ {grouped},{centavos:02}")
    }
}
