//! Proposal form schemas.
//!
//! Two hard-coded layouts: a generic one used by most funders, and the CNPq
//! layout whose sections mirror the agency's submission form. `campos_formulario`
//! is a flat object keyed by field key with text values.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::editais::dates::fold;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    Generico,
    Cnpq,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampoSchema {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub max_chars: usize,
    /// Guidance shown to the writer and handed to the model when drafting.
    pub instrucao: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormSchema {
    pub kind: SchemaKind,
    pub campos: &'static [CampoSchema],
}

const fn campo(
    key: &'static str,
    label: &'static str,
    required: bool,
    max_chars: usize,
    instrucao: &'static str,
) -> CampoSchema {
    CampoSchema {
        key,
        label,
        required,
        max_chars,
        instrucao,
    }
}

const CAMPOS_GENERICOS: &[CampoSchema] = &[
    campo("titulo", "Título do projeto", true, 250, "Título claro e específico."),
    campo("resumo", "Resumo", true, 2_000, "Síntese do problema, objetivo, método e impacto."),
    campo("introducao", "Introdução e justificativa", true, 6_000, "Contexto, problema e relevância."),
    campo("objetivos", "Objetivos", true, 3_000, "Objetivo geral e objetivos específicos."),
    campo("metodologia", "Metodologia", true, 8_000, "Etapas, métodos e materiais."),
    campo("resultados_esperados", "Resultados esperados", true, 3_000, "Entregas e impactos mensuráveis."),
    campo("cronograma", "Cronograma", true, 3_000, "Atividades por mês ou trimestre."),
    campo("orcamento", "Orçamento", true, 3_000, "Itens de custeio e capital com valores."),
    campo("equipe", "Equipe", false, 3_000, "Membros, papéis e qualificações."),
    campo("referencias", "Referências", false, 5_000, "Referências bibliográficas."),
];

const CAMPOS_CNPQ: &[CampoSchema] = &[
    campo("titulo_projeto", "Título do projeto", true, 250, "Título conforme a chamada."),
    campo("resumo", "Resumo", true, 2_000, "Resumo do projeto em até 2.000 caracteres."),
    campo("palavras_chave", "Palavras-chave", true, 200, "De 3 a 6 palavras-chave separadas por ponto e vírgula."),
    campo("introducao_justificativa", "Introdução e justificativa", true, 6_000, "Caracterização do problema e justificativa."),
    campo("objetivos_gerais", "Objetivo geral", true, 1_500, "Objetivo geral do projeto."),
    campo("objetivos_especificos", "Objetivos específicos", true, 3_000, "Objetivos específicos enumerados."),
    campo("metodologia", "Metodologia", true, 8_000, "Metodologia a ser empregada."),
    campo("cronograma_execucao", "Cronograma de execução", true, 3_000, "Cronograma físico das atividades."),
    campo("orcamento_detalhado", "Orçamento detalhado", true, 4_000, "Custeio, capital e bolsas, com justificativa."),
    campo("equipe_executora", "Equipe executora", true, 3_000, "Membros da equipe e suas atribuições."),
    campo("resultados_impactos", "Resultados e impactos esperados", true, 3_000, "Impactos científicos, tecnológicos e sociais."),
    campo("infraestrutura", "Infraestrutura disponível", false, 2_000, "Laboratórios e equipamentos disponíveis."),
    campo("referencias", "Referências bibliográficas", false, 5_000, "Referências citadas."),
];

pub static SCHEMA_GENERICO: FormSchema = FormSchema {
    kind: SchemaKind::Generico,
    campos: CAMPOS_GENERICOS,
};

pub static SCHEMA_CNPQ: FormSchema = FormSchema {
    kind: SchemaKind::Cnpq,
    campos: CAMPOS_CNPQ,
};

impl FormSchema {
    pub fn for_kind(kind: SchemaKind) -> &'static FormSchema {
        match kind {
            SchemaKind::Generico => &SCHEMA_GENERICO,
            SchemaKind::Cnpq => &SCHEMA_CNPQ,
        }
    }

    pub fn campo(&self, key: &str) -> Option<&CampoSchema> {
        self.campos.iter().find(|c| c.key == key)
    }

    /// Empty form with every field present, as a new draft starts.
    pub fn campos_vazios(&self) -> Value {
        Value::Object(
            self.campos
                .iter()
                .map(|c| (c.key.to_string(), Value::String(String::new())))
                .collect(),
        )
    }
}

/// CNPq calls get the CNPq layout; everything else gets the generic one.
pub fn schema_para(orgao: Option<&str>, titulo: Option<&str>) -> &'static FormSchema {
    let menciona_cnpq = [orgao, titulo]
        .into_iter()
        .flatten()
        .any(|texto| {
            let folded = fold(texto);
            folded.contains("cnpq")
                || folded.contains("conselho nacional de desenvolvimento cientifico")
        });
    if menciona_cnpq {
        &SCHEMA_CNPQ
    } else {
        &SCHEMA_GENERICO
    }
}

/// Share of required fields holding non-blank text, 0..=100, rounded down.
pub fn calcular_progresso(schema: &FormSchema, campos: &Value) -> i32 {
    let obrigatorios: Vec<&CampoSchema> = schema.campos.iter().filter(|c| c.required).collect();
    if obrigatorios.is_empty() {
        return 100;
    }
    let preenchidos = obrigatorios
        .iter()
        .filter(|c| {
            campos
                .get(c.key)
                .and_then(Value::as_str)
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false)
        })
        .count();
    (preenchidos * 100 / obrigatorios.len()) as i32
}

/// Rejects unknown keys, non-text values and texts over the field limit.
pub fn validar_campos(schema: &FormSchema, campos: &Value) -> Result<(), String> {
    let obj = campos
        .as_object()
        .ok_or_else(|| "campos_formulario must be an object".to_string())?;
    for (key, value) in obj {
        let campo = schema
            .campo(key)
            .ok_or_else(|| format!("unknown field '{key}' for {:?} form", schema.kind))?;
        let texto = match value {
            Value::String(s) => s,
            Value::Null => continue,
            _ => return Err(format!("field '{key}' must be text")),
        };
        let chars = texto.chars().count();
        if chars > campo.max_chars {
            return Err(format!(
                "field '{key}' has {chars} characters, limit is {}",
                campo.max_chars
            ));
        }
    }
    Ok(())
}

/// Overlays `alteracoes` onto `atuais`; null values clear a field.
pub fn mesclar_campos(atuais: &Value, alteracoes: &Value) -> Value {
    let mut merged: Map<String, Value> = atuais.as_object().cloned().unwrap_or_default();
    if let Some(obj) = alteracoes.as_object() {
        for (key, value) in obj {
            match value {
                Value::Null => {
                    merged.insert(key.clone(), Value::String(String::new()));
                }
                other => {
                    merged.insert(key.clone(), other.clone());
                }
            }
        }
    }
    Value::Object(merged)
}

/// Keeps only the schema's fields from a model answer, coercing scalars to text
/// and cutting texts that overflow the field limit.
pub fn filtrar_resposta(schema: &FormSchema, resposta: &Value) -> Value {
    let mut campos = Map::new();
    for campo in schema.campos {
        let texto = match resposta.get(campo.key) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|i| match i {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let texto: String = texto.chars().take(campo.max_chars).collect();
        campos.insert(campo.key.to_string(), Value::String(texto));
    }
    Value::Object(campos)
}
