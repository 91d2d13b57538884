// src/niche/mod.rs
pub mod classifier;
pub mod openai;

#[allow(unused_imports)]
pub use classifier::{BatchOutcome, NicheClassifier, NicheReport};
#[allow(unused_imports)]
pub use openai::{ChatCompletion, OpenAiClient};
