// Proposal drafts: status lifecycle, form schemas and CRUD.

pub mod forms;
pub mod handlers;
pub mod repository;
pub mod status;
