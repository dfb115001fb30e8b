// Prompt templates for the AI proxy endpoints.

pub const EXTRACT_ROLE: &str = "\
Você é um analista especializado em editais de fomento à pesquisa e inovação no Brasil. \
Extraia informações estruturadas de editais com precisão.";

pub const EXTRACT_PROMPT_TEMPLATE: &str = r#"Analise o(s) documento(s) anexado(s) do edital e atenda à solicitação abaixo.

SOLICITAÇÃO:
{message}

{grounding}

FORMATO DE SAÍDA (retorne exatamente esta estrutura):
{
  "titulo": "string",
  "orgao": "string | null",
  "descricao": "string | null",
  "valor_projeto": { "valor": "string" } | { "minimo": number, "maximo": number } | { "faixas": [{ "descricao": "string", "valor": "string" }] } | null,
  "prazo_inscricao": { "prazos": [{ "descricao": "string", "inicio": "YYYY-MM-DD | null", "fim": "YYYY-MM-DD" }] } | { "tipo": "fluxo contínuo" } | null,
  "timeline_estimada": { "fases": [{ "nome": "string", "data_inicio": "YYYY-MM-DD | null", "data_fim": "YYYY-MM-DD | null" }] },
  "is_researcher": boolean,
  "is_company": boolean,
  "requisitos": ["string"],
  "documentos_necessarios": ["string"],
  "areas_tematicas": ["string"]
}"#;

pub const PROPOSTA_ROLE: &str = "\
Você é um redator experiente de propostas para editais de fomento brasileiros. \
Escreva em português formal e técnico, alinhado aos critérios de avaliação do edital.";

pub const PROPOSTA_PROMPT_TEMPLATE: &str = r#"Redija uma proposta para o edital descrito abaixo, preenchendo cada campo do formulário.

INFORMAÇÕES DO EDITAL:
{edital_info}

CONTEXTO DO PROPONENTE:
{user_context}

{grounding}

CAMPOS DO FORMULÁRIO ({schema}):
{campos}

Retorne um objeto JSON com exatamente estas chaves: {keys}.
Cada valor deve ser texto corrido e respeitar o limite de caracteres indicado."#;
