//! Context-free grammars and their normalization into Chomsky normal form.

pub mod error;
pub mod grammar;
pub mod grammars;
pub mod input;
pub mod language;
