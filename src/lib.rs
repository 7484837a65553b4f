pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod output;
pub mod payload;
pub mod query;
pub mod render;
pub mod runner;
pub mod session;

#[cfg(test)]
mod tests;
