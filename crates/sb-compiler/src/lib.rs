//! Site Blocker Declarative Rule Compiler
//!
//! This crate projects enabled block lists into the bounded set of static
//! redirect rules installed in the browser's declarative navigation layer.

pub mod builder;
pub mod rule;

pub use builder::{compile_rules, CompileOutput, CompileStats, RuleCompiler, MAX_RULES};
pub use rule::{DeclarativeRule, ResourceType};
