//! Edital extraction: prompt assembly and normalization of the model answer.

use serde::Serialize;
use serde_json::Value;

use crate::ai::prompts::{EXTRACT_PROMPT_TEMPLATE, EXTRACT_ROLE};
use crate::editais::campo::CampoFormatado;
use crate::editais::prazo::format_prazo_inscricao;
use crate::editais::valor::format_valor_projeto;
use crate::errors::AppError;
use crate::gemini::prompts::{GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM};

/// Extracted fields plus the dashboard renderings of the two loose ones.
#[derive(Debug, Serialize)]
pub struct EditalExtraido {
    pub info: Value,
    pub valor: CampoFormatado,
    pub prazo: CampoFormatado,
}

pub fn system_instruction() -> String {
    format!("{EXTRACT_ROLE} {JSON_ONLY_SYSTEM}")
}

pub fn build_prompt(message: &str) -> String {
    EXTRACT_PROMPT_TEMPLATE
        .replace("{grounding}", GROUNDING_INSTRUCTION)
        .replace("{message}", message.trim())
}

/// Accepts only an object answer; `valor`/`prazo` are rendered with the same
/// normalizers the edital listing uses.
pub fn normalizar_extracao(info: Value) -> Result<EditalExtraido, AppError> {
    if !info.is_object() {
        return Err(AppError::Ai(format!(
            "Edital extraction returned {} instead of an object",
            tipo_json(&info)
        )));
    }
    Ok(EditalExtraido {
        valor: format_valor_projeto(info.get("valor_projeto")),
        prazo: format_prazo_inscricao(info.get("prazo_inscricao")),
        info,
    })
}

fn tipo_json(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_embeds_message_and_grounding() {
        let prompt = build_prompt("  Extraia os dados da chamada 12/2025  ");
        assert!(prompt.contains("SOLICITAÇÃO:\nExtraia os dados da chamada 12/2025\n"));
        assert!(prompt.contains(GROUNDING_INSTRUCTION));
        assert!(!prompt.contains("{message}"));
        assert!(prompt.contains("\"prazo_inscricao\""));
    }

    #[test]
    fn test_system_instruction_demands_json() {
        assert!(system_instruction().contains("JSON"));
    }

    #[test]
    fn test_extraction_gets_formatted_fields() {
        let info = json!({
            "titulo": "Chamada Universal",
            "valor_projeto": {"valor": "R$ 100"},
            "prazo_inscricao": {"prazos": [{"fim": "2025-12-10"}]}
        });
        let extraido = normalizar_extracao(info).unwrap();
        assert_eq!(extraido.valor.display, "R$ 100");
        assert!(extraido.prazo.display.contains("Até 2025-12-10"));
        assert_eq!(extraido.info["titulo"], "Chamada Universal");
    }

    #[test]
    fn test_missing_loose_fields_render_as_not_informed() {
        let extraido = normalizar_extracao(json!({"titulo": "X"})).unwrap();
        assert_eq!(extraido.valor, CampoFormatado::nao_informado());
        assert_eq!(extraido.prazo, CampoFormatado::nao_informado());
    }

    #[test]
    fn test_non_object_answer_rejected() {
        let err = normalizar_extracao(json!(["titulo"])).unwrap_err();
        assert!(matches!(err, AppError::Ai(msg) if msg.contains("an array")));
    }
}
