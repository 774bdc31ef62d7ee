pub mod commands;
pub mod lifecycle;
pub mod model;
