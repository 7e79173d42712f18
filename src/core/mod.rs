//! Translation and execution machinery.

pub mod cast;
pub mod codec;
pub mod composer;
pub mod console;
pub mod control;
pub mod engine;
pub mod lexicon;
pub mod pipeline;
pub mod translate;
pub mod words;
