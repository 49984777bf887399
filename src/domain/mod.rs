// Domain layer - Core types and composition rules

pub mod errors;
pub mod model;
pub mod rules;
