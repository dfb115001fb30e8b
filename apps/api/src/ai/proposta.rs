//! Proposal drafting: schema selection, prompt assembly and answer filtering.

use serde::Serialize;
use serde_json::Value;

use crate::ai::prompts::{PROPOSTA_PROMPT_TEMPLATE, PROPOSTA_ROLE};
use crate::editais::campo::NAO_INFORMADO;
use crate::gemini::prompts::{GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::models::edital::EditalRow;
use crate::propostas::forms::{
    calcular_progresso, filtrar_resposta, schema_para, FormSchema, SchemaKind,
};

#[derive(Debug, Serialize)]
pub struct PropostaGerada {
    pub campos_formulario: Value,
    pub schema: &'static FormSchema,
    pub progresso: i32,
}

pub fn system_instruction() -> String {
    format!("{PROPOSTA_ROLE} {JSON_ONLY_SYSTEM}")
}

fn texto_de(info: &Value, key: &str) -> Option<String> {
    info.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// The caller's `edital_info.orgao` decides the layout; the stored edital is
/// consulted only when the caller sent none.
pub fn schema_do_edital(edital_info: &Value, stored: &EditalRow) -> &'static FormSchema {
    let titulo = texto_de(edital_info, "titulo");
    match texto_de(edital_info, "orgao") {
        Some(orgao) => schema_para(Some(&orgao), titulo.as_deref()),
        None => schema_para(
            stored.orgao.as_deref(),
            Some(titulo.as_deref().unwrap_or(&stored.titulo)),
        ),
    }
}

fn render_contexto(value: &Value) -> String {
    match value {
        Value::Null => NAO_INFORMADO.to_string(),
        Value::String(s) if s.trim().is_empty() => NAO_INFORMADO.to_string(),
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) if map.is_empty() => NAO_INFORMADO.to_string(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn nome_do_schema(kind: SchemaKind) -> &'static str {
    match kind {
        SchemaKind::Generico => "modelo genérico",
        SchemaKind::Cnpq => "modelo CNPq",
    }
}

pub fn build_prompt(schema: &FormSchema, edital_info: &Value, user_context: &Value) -> String {
    let campos = schema
        .campos
        .iter()
        .map(|c| {
            let obrigatorio = if c.required { ", obrigatório" } else { "" };
            format!(
                "- {} ({}, até {} caracteres{}): {}",
                c.key, c.label, c.max_chars, obrigatorio, c.instrucao
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let keys = schema
        .campos
        .iter()
        .map(|c| format!("\"{}\"", c.key))
        .collect::<Vec<_>>()
        .join(", ");

    PROPOSTA_PROMPT_TEMPLATE
        .replace("{grounding}", GROUNDING_INSTRUCTION)
        .replace("{schema}", nome_do_schema(schema.kind))
        .replace("{campos}", &campos)
        .replace("{keys}", &keys)
        .replace("{edital_info}", &render_contexto(edital_info))
        .replace("{user_context}", &render_contexto(user_context))
}

pub fn montar_resultado(schema: &'static FormSchema, resposta: &Value) -> PropostaGerada {
    let campos_formulario = filtrar_resposta(schema, resposta);
    PropostaGerada {
        progresso: calcular_progresso(schema, &campos_formulario),
        campos_formulario,
        schema,
    }
}
