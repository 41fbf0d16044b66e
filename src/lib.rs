//! Intake Assist: mail intake submission core.

pub mod backend;
pub mod completion;
pub mod config;
pub mod error;
pub mod intake;
pub mod mail;
pub mod notify;
pub mod render;
pub mod submission;

#[cfg(test)]
mod testing;
