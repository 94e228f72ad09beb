//! Azure CLI interaction.
//!
//! This module handles all Azure-related operations:
//! - [`cli`] - Command execution for Azure CLI
//! - [`client`] - The [`ControlPlane`] trait and its `az` implementation

mod cli;
mod client;

// Re-export public types and functions
pub use cli::{check_az_cli, is_not_found, parse_json, run, run_json};
pub use client::{AzCli, ControlPlane, PowerAction};
