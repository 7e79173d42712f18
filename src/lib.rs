//! Soliloquy: stage-play programs in two surface forms.
//!
//! A program is a cast of characters, each holding one integer and a stack
//! of remembered integers, who enter and leave the stage and talk to each
//! other. The same program can be written as prose (every value a noun
//! phrase, every statement a sentence) or as a structured statement tree.
//! This crate translates between the two forms and performs either one.

pub mod core;
pub mod schema;
