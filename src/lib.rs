//! Draw Engine - progression for tournament draws.
//!
//! This library keeps a draw consistent as results come in: it advances
//! winners, resolves BYE and double-exit cascades, feeds losers and group
//! finishers into linked structures, and undoes all of that when a result is
//! corrected or cleared.
//!
//! The entry point is [`cascade::DrawEngine`]. Draws are plain serializable
//! data ([`types::DrawDefinition`]); every command produces a new draw or an
//! error, never a partially updated one.

pub mod cascade;
pub mod commands;
pub mod config;
pub mod persistence;
pub mod state;
pub mod tally;
pub mod types;

#[cfg(test)]
pub mod test_utils;
