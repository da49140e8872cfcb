pub mod config;
pub mod element;
pub mod expr;
pub mod input;
pub mod mapping;
pub mod pipeline;
pub mod sinks;
