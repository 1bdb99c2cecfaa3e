//! Client core for the krumpled party game: session resolution, game state
//! synchronization and round actions against the krumnet API.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod request;
pub mod services;
pub mod state;
pub mod telemetry;

#[cfg(test)]
mod testing;
