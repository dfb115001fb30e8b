//! Brazilian document numbers: CPF, CNPJ and Lattes CV identifiers.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentoInvalido {
    pub campo: &'static str,
    pub motivo: String,
}

fn digitos(raw: &str) -> Vec<u32> {
    raw.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// Only digits, punctuation and spaces are tolerated around a document number.
fn caracteres_validos(raw: &str) -> bool {
    raw.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '/' | ' '))
}

fn todos_iguais(d: &[u32]) -> bool {
    d.windows(2).all(|w| w[0] == w[1])
}

/// Mod-11 check digit over `d` with the given weights.
fn digito_verificador(d: &[u32], pesos: &[u32]) -> u32 {
    let soma: u32 = d.iter().zip(pesos).map(|(a, b)| a * b).sum();
    let resto = soma % 11;
    if resto < 2 {
        0
    } else {
        11 - resto
    }
}

/// Validates a CPF and returns its 11 digits.
pub fn normalizar_cpf(raw: &str) -> Result<String, DocumentoInvalido> {
    let invalido = |motivo: &str| DocumentoInvalido {
        campo: "cpf",
        motivo: motivo.to_string(),
    };
    if !caracteres_validos(raw) {
        return Err(invalido("contém caracteres inválidos"));
    }
    let d = digitos(raw);
    if d.len() != 11 {
        return Err(invalido("deve ter 11 dígitos"));
    }
    if todos_iguais(&d) {
        return Err(invalido("sequência repetida"));
    }
    let dv1 = digito_verificador(&d[..9], &[10, 9, 8, 7, 6, 5, 4, 3, 2]);
    let dv2 = digito_verificador(&d[..10], &[11, 10, 9, 8, 7, 6, 5, 4, 3, 2]);
    if d[9] != dv1 || d[10] != dv2 {
        return Err(invalido("dígitos verificadores não conferem"));
    }
    Ok(d.iter().map(|n| char::from_digit(*n, 10).unwrap_or('0')).collect())
}

/// Validates a CNPJ and returns its 14 digits.
pub fn normalizar_cnpj(raw: &str) -> Result<String, DocumentoInvalido> {
    let invalido = |motivo: &str| DocumentoInvalido {
        campo: "cnpj",
        motivo: motivo.to_string(),
    };
    if !caracteres_validos(raw) {
        return Err(invalido("contém caracteres inválidos"));
    }
    let d = digitos(raw);
    if d.len() != 14 {
        return Err(invalido("deve ter 14 dígitos"));
    }
    if todos_iguais(&d) {
        return Err(invalido("sequência repetida"));
    }
    let dv1 = digito_verificador(&d[..12], &[5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);
    let dv2 = digito_verificador(&d[..13], &[6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);
    if d[12] != dv1 || d[13] != dv2 {
        return Err(invalido("dígitos verificadores não conferem"));
    }
    Ok(d.iter().map(|n| char::from_digit(*n, 10).unwrap_or('0')).collect())
}

/// Lattes CV ids are 16 digits (e.g. `1234567890123456`).
pub fn normalizar_lattes(raw: &str) -> Result<String, DocumentoInvalido> {
    let trimmed = raw.trim().trim_end_matches('/');
    // Accept the full CV URL as pasted from the browser.
    let id = trimmed
        .rsplit('/')
        .next()
        .unwrap_or(trimmed)
        .trim();
    if id.len() == 16 && id.chars().all(|c| c.is_ascii_digit()) {
        Ok(id.to_string())
    } else {
        Err(DocumentoInvalido {
            campo: "lattes_id",
            motivo: "deve ter 16 dígitos".to_string(),
        })
    }
}
