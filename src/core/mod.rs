// src/core/mod.rs — Shared domain types

pub mod types;
