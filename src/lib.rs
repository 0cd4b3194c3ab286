//! WorkLens: deal intelligence document analyzer.
//!
//! The core is the analysis request pipeline ([`analysis`]): one outbound
//! generative-model call per user action, wrapped in bounded retry with
//! exponential backoff, with every outcome normalized into a displayable
//! result. The rest is host plumbing: document intake, a settings store,
//! and the CLI.

pub mod analysis;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod doc_processor;
pub mod llm;
