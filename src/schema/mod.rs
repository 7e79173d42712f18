//! Data types shared by the translators and the engine.

pub mod phrase;
pub mod play;
pub mod program;
pub mod statement;
pub mod value;
