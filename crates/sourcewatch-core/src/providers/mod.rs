pub mod llm;
pub mod source;
