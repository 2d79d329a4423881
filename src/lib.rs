//! wordlens: next-word prediction visualizer.
//!
//! Submits a phrase to a prediction service, normalizes the reply, and
//! renders the ranked predictions, confidence chart, analysis text, and
//! attention graph to the terminal, a local dashboard, or a static page.

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod parser;
pub mod render;
pub mod safety;
pub mod service;
pub mod session;
pub mod state;
pub mod web;
