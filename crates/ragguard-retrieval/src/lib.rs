//! Role-aware retrieval over a shared document registry and semantic index.
//!
//! [`Corpus`] admits documents so that they become searchable only once their
//! access metadata is registered. [`Retriever`] over-fetches from the index,
//! drops everything the caller may not see, and puts the caller's own
//! department first. [`Assistant`] turns a retrieval into a cited answer.
pub mod answer;
pub mod corpus;
pub mod retriever;

pub use answer::{build_prompt, Answer, AnswerGenerator, Assistant, ExcerptGenerator};
pub use corpus::{Corpus, Upload};
pub use retriever::{RetrievalResult, RetrievedDocument, Retriever};
