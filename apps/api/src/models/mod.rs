pub mod edital;
pub mod perfil;
pub mod proposta;
