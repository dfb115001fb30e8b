// AI proxy: edital extraction and proposal drafting over uploaded documents.

pub mod extract;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod proposta;
