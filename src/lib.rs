// src/lib.rs — Library root for Rehearsal

pub mod api;
pub mod cli;
pub mod conversation;
pub mod core;
pub mod evaluator;
pub mod infra;
pub mod ingest;
pub mod provider;
pub mod session;
pub mod store;
