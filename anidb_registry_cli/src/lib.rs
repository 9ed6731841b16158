//! AniDB registry operator tool
//!
//! Renders commands, parses captured replies and issues single live queries
//! through the registry core.

pub mod commands;
pub mod config;
