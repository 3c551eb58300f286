//! # parley-commands
//!
//! Prefix command framework: a [`Bot`] event handler that parses messages
//! into commands, converts their arguments, and runs checks and cooldowns
//! before the callback.

pub mod args;
pub mod bot;
pub mod checks;
pub mod command;
pub mod context;
pub mod converters;
pub mod cooldown;
pub mod error;
pub mod help;
pub mod view;

#[cfg(test)]
mod test_utils;

pub use args::Args;
pub use bot::{Bot, BotBuilder, Prefix};
pub use checks::{Check, RoleRef};
pub use command::{Command, Group};
pub use context::CommandContext;
pub use converters::{ConvertContext, FromArgument};
pub use cooldown::{BucketType, Cooldown};
pub use error::{CommandError, CommandResult};
pub use view::{StringView, ViewError};
