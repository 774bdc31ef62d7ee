pub mod commands;
pub mod decrement;
pub mod model;
