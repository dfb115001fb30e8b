// Shared prompt fragments. Each feature keeps its own prompts.rs next to it;
// only cross-cutting instructions live here.

/// System instruction that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "Você é um assistente preciso e estruturado. \
    Responda SOMENTE com JSON válido. \
    Não inclua texto fora do objeto JSON. \
    Não use blocos de código markdown. \
    Não inclua explicações nem desculpas.";

/// Appended to every prompt that works from uploaded documents.
pub const GROUNDING_INSTRUCTION: &str = "\
    IMPORTANTE: use apenas informações presentes nos documentos anexados ou no contexto fornecido. \
    Não invente valores, datas, órgãos ou requisitos. \
    Quando uma informação não estiver disponível, use null.";
