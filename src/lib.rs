//! IARIS - Impact consulting assistant
//!
//! A retrieval-augmented chat assistant for managers of companies, NGOs and
//! public bodies working on positive socio-environmental impact. Questions are
//! answered by retrieving passages from a curated document corpus, grounding a
//! language model's answer on them and citing the source pages.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod rag;
pub mod retrieval;
pub mod session;

pub use error::{IarisError, Result};
