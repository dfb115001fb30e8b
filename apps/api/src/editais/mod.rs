// Edital catalogue: normalizers for loosely-typed fields, the activity
// resolver, eligibility and the read-only HTTP surface.

pub mod campo;
pub mod dates;
pub mod elegibilidade;
pub mod handlers;
pub mod prazo;
pub mod repository;
pub mod status;
pub mod valor;
pub mod view;
