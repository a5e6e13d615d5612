//! # quill-oracle
//!
//! Semantic Oracle client (Gemini-backed) and the intent fingerprinter
//! that keys the dedup store.

pub mod fingerprint;
pub mod gemini;

pub use fingerprint::{Fingerprint, Fingerprinter};
pub use gemini::GeminiOracle;
