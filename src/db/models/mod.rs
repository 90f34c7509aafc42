// src/db/models/mod.rs

//! Data models for ppm database entities
//!
//! This module defines Rust structs that correspond to database tables
//! and provides methods for creating, reading, updating, and deleting records.

mod command;
mod host;
mod icon;
mod macro_entry;
mod pluginpack;
mod service;

pub use command::{CHECK_COMMAND_TYPE, Command};
pub use host::{Host, INHERIT};
pub use icon::Icon;
pub use macro_entry::{MacroEntry, MacroOwner};
pub use pluginpack::PluginPack;
pub use service::Service;
