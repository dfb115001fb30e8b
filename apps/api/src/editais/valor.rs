//! `valor_projeto` normalizer.

use serde_json::{Map, Value};

use crate::editais::campo::{
    classificar, compacto, escalar, primeiro, CampoFormatado, Entrada,
};

/// Keys under which imported editais keep a list of funding options.
const LISTAS: &[&str] = &["valores", "faixas", "modalidades"];
/// Keys naming one funding option inside such a list.
const ROTULOS: &[&str] = &["descricao", "nome", "modalidade", "tipo", "categoria"];
/// Keys holding the amount of one funding option.
const MONTANTES: &[&str] = &["valor", "montante", "valor_maximo", "maximo", "valor_total"];

/// Reduces a `valor_projeto` field to a display string plus optional detail lines.
///
/// Object shapes are tried in order: `valor`, `tipo`+`montante`, `minimo`/`maximo`,
/// `valor_total`, nested option lists. Anything unrecognised is shown as compact JSON.
pub fn format_valor_projeto(value: Option<&Value>) -> CampoFormatado {
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
        Value::Object(obj) => formatar_objeto(obj),
        Value::Array(items) => formatar_lista(items),
        other => (
            escalar(other).unwrap_or_else(|| compacto(other)),
            Vec::new(),
        ),
    }
}

fn formatar_objeto(obj: &Map<String, Value>) -> (String, Vec<String>) {
    if let Some(valor) = obj.get("valor") {
        match valor {
            // `{"valor": [...]}` is a list of options in disguise.
            Value::Array(items) => return formatar_lista(items),
            Value::Object(inner) => return formatar_objeto(inner),
            other => {
                if let Some(texto) = escalar(other) {
                    return (texto, Vec::new());
                }
            }
        }
    }

    if let (Some(tipo), Some(montante)) = (
        obj.get("tipo").and_then(escalar),
        obj.get("montante").and_then(escalar),
    ) {
        return (format!("{tipo}: {montante}"), Vec::new());
    }

    let minimo = obj.get("minimo").and_then(escalar);
    let maximo = obj.get("maximo").and_then(escalar);
    match (minimo, maximo) {
        (Some(min), Some(max)) => return (format!("De {min} a {max}"), Vec::new()),
        (Some(min), None) => return (format!("A partir de {min}"), Vec::new()),
        (None, Some(max)) => return (format!("Até {max}"), Vec::new()),
        (None, None) => {}
    }

    if let Some(total) = obj.get("valor_total").and_then(escalar) {
        return (total, Vec::new());
    }

    if let Some(items) = LISTAS
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_array))
    {
        return formatar_lista(items);
    }

    (compacto(&Value::Object(obj.clone())), Vec::new())
}

fn formatar_lista(items: &[Value]) -> (String, Vec<String>) {
    let detalhes: Vec<String> = items.iter().filter_map(formatar_opcao).collect();
    match detalhes.len() {
        0 => (compacto(&Value::Array(items.to_vec())), Vec::new()),
        1 => {
            let unico = items
                .iter()
                .find_map(montante_da_opcao)
                .unwrap_or_else(|| detalhes[0].clone());
            (unico, detalhes)
        }
        n => (format!("Valores variáveis ({n} opções)"), detalhes),
    }
}

/// `"{rótulo}: {montante}"`, or just whichever of the two is present.
fn formatar_opcao(item: &Value) -> Option<String> {
    match item {
        Value::Object(obj) => {
            let rotulo = primeiro(obj, ROTULOS).and_then(escalar);
            let montante = primeiro(obj, MONTANTES).and_then(escalar);
            match (rotulo, montante) {
                (Some(r), Some(m)) => Some(format!("{r}: {m}")),
                (Some(r), None) => Some(r),
                (None, Some(m)) => Some(m),
                (None, None) => None,
            }
        }
        other => escalar(other),
    }
}

fn montante_da_opcao(item: &Value) -> Option<String> {
    match item {
        Value::Object(obj) => primeiro(obj, MONTANTES).and_then(escalar),
        other => escalar(other),
    }
}
