//! Built-in tool implementations.
//!
//! Each sub-module implements one tool plus a `register` function that
//! adds its metadata and handler to a [`ToolRegistry`].

pub mod generate_users;
pub mod read_json;
pub mod write_json;

use super::ToolRegistry;

/// Register every DataGen tool in `reg`.
pub fn register_all(reg: &mut ToolRegistry) {
    write_json::register(reg);
    read_json::register(reg);
    generate_users::register(reg);
}
