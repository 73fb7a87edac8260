pub mod chomsky_normal_form;
pub mod context_free;
pub mod normalization;
pub mod types;
