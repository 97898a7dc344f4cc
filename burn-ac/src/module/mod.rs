pub mod component;
pub mod evaluator;
pub mod nn;
