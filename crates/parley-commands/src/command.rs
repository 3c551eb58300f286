//! Commands and command groups

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::args::Args;
use crate::checks::Check;
use crate::context::CommandContext;
use crate::cooldown::{BucketType, Cooldown};
use crate::error::{CommandError, CommandResult};

pub(crate) type Callback = Arc<dyn Fn(CommandContext, Args) -> BoxFuture<'static, CommandResult> + Send + Sync>;

fn boxed<F, Fut>(callback: F) -> Callback
where
    F: Fn(CommandContext, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    Arc::new(move |ctx, args| callback(ctx, args).boxed())
}

/// A named command with its callback and invocation rules
///
/// Built with chained setters:
///
/// ```
/// use parley_commands::{checks, Command, CommandContext, Args, BucketType};
/// use std::time::Duration;
///
/// let echo = Command::new("echo", |ctx: CommandContext, mut args: Args| async move {
///     let text = args.rest("text")?;
///     ctx.send(text).await?;
///     Ok(())
/// })
/// .alias("say")
/// .help("Repeat the given text")
/// .check(checks::guild_only())
/// .cooldown(1, Duration::from_secs(5), BucketType::User);
/// assert!(echo.matches("SAY", true));
/// ```
#[derive(Clone)]
pub struct Command {
    name: String,
    aliases: Vec<String>,
    help: Option<String>,
    brief: Option<String>,
    usage: Option<String>,
    checks: Vec<Check>,
    cooldown: Option<Arc<Cooldown>>,
    enabled: bool,
    hidden: bool,
    guild_only: bool,
    callback: Option<Callback>,
    children: Vec<Command>,
    invoke_without_command: bool,
}

impl Command {
    pub fn new<F, Fut>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(CommandContext, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        let mut command = Self::bare(name);
        command.callback = Some(boxed(callback));
        command
    }

    fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            help: None,
            brief: None,
            usage: None,
            checks: Vec::new(),
            cooldown: None,
            enabled: true,
            hidden: false,
            guild_only: false,
            callback: None,
            children: Vec::new(),
            invoke_without_command: false,
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Long description shown by `help <command>`
    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// One-line description shown in the command list
    #[must_use]
    pub fn brief(mut self, brief: impl Into<String>) -> Self {
        self.brief = Some(brief.into());
        self
    }

    /// Argument signature, e.g. `<member> [reason]`
    #[must_use]
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    #[must_use]
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    #[must_use]
    pub fn cooldown(mut self, rate: u32, per: Duration, bucket: BucketType) -> Self {
        self.cooldown = Some(Arc::new(Cooldown::new(rate, per, bucket)));
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    #[must_use]
    pub fn guild_only(mut self, guild_only: bool) -> Self {
        self.guild_only = guild_only;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Text for the command list: the brief, else the first line of help
    pub fn short_doc(&self) -> &str {
        self.brief
            .as_deref()
            .or_else(|| self.help.as_deref().and_then(|h| h.lines().next()))
            .unwrap_or("")
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn usage_text(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn subcommands(&self) -> &[Command] {
        &self.children
    }

    #[inline]
    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }

    /// Whether `name` is this command's name or an alias
    pub fn matches(&self, name: &str, case_insensitive: bool) -> bool {
        let eq = |candidate: &str| {
            if case_insensitive {
                candidate.to_lowercase() == name.to_lowercase()
            } else {
                candidate == name
            }
        };
        eq(&self.name) || self.aliases.iter().any(|a| eq(a))
    }

    pub fn find_subcommand(&self, name: &str, case_insensitive: bool) -> Option<&Command> {
        find(&self.children, name, case_insensitive)
    }

    /// Whether the callback should run when a subcommand follows
    pub(crate) fn runs_before_subcommand(&self) -> bool {
        self.is_group() && !self.invoke_without_command && self.callback.is_some()
    }

    /// Enabled state, guild restriction, checks, then cooldown
    pub(crate) async fn prepare(&self, ctx: &CommandContext) -> CommandResult<()> {
        if !self.enabled {
            return Err(CommandError::DisabledCommand(ctx.command.clone()));
        }
        if self.guild_only && ctx.is_private() {
            return Err(CommandError::NoPrivateMessage);
        }
        for check in &self.checks {
            check.run(ctx).await?;
        }
        if let Some(retry_after) = self
            .cooldown
            .as_ref()
            .and_then(|c| c.update_rate_limit(&ctx.message))
        {
            return Err(CommandError::CommandOnCooldown { retry_after });
        }
        Ok(())
    }

    /// Run the callback; a group without one does nothing
    pub(crate) async fn invoke(&self, ctx: CommandContext, args: Args) -> CommandResult<()> {
        match &self.callback {
            Some(callback) => callback(ctx, args).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("checks", &self.checks)
            .field("cooldown", &self.cooldown)
            .field("enabled", &self.enabled)
            .field("hidden", &self.hidden)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

pub(crate) fn find<'a>(commands: &'a [Command], name: &str, case_insensitive: bool) -> Option<&'a Command> {
    commands.iter().find(|c| c.matches(name, case_insensitive))
}

/// A command holding sub-commands
///
/// Without a callback the group only dispatches to its children. With
/// `invoke_without_command` its callback runs only when no child matched.
pub struct Group {
    command: Command,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            command: Command::bare(name),
        }
    }

    #[must_use]
    pub fn callback<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(CommandContext, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        self.command.callback = Some(boxed(callback));
        self
    }

    #[must_use]
    pub fn command(mut self, command: impl Into<Command>) -> Self {
        self.command.children.push(command.into());
        self
    }

    #[must_use]
    pub fn invoke_without_command(mut self, value: bool) -> Self {
        self.command.invoke_without_command = value;
        self
    }

    /// Apply any [`Command`] setter to the group itself
    #[must_use]
    pub fn configure(mut self, f: impl FnOnce(Command) -> Command) -> Self {
        self.command = f(self.command);
        self
    }
}

impl From<Group> for Command {
    fn from(group: Group) -> Self {
        group.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> Command {
        Command::new(name, |_ctx, _args| async { Ok(()) })
    }

    #[test]
    fn test_matching() {
        let command = noop("Ping").alias("p");
        assert!(command.matches("Ping", false));
        assert!(!command.matches("ping", false));
        assert!(command.matches("ping", true));
        assert!(command.matches("p", false));
        assert!(!command.matches("pong", true));
    }

    #[test]
    fn test_short_doc() {
        assert_eq!(noop("a").short_doc(), "");
        assert_eq!(noop("a").help("First line\nMore detail").short_doc(), "First line");
        assert_eq!(noop("a").help("Long").brief("Short").short_doc(), "Short");
    }

    #[test]
    fn test_group() {
        let group: Command = Group::new("tag")
            .command(noop("create").alias("new"))
            .command(noop("delete"))
            .configure(|c| c.brief("Tags"))
            .into();
        assert!(group.is_group());
        assert_eq!(group.short_doc(), "Tags");
        assert_eq!(group.find_subcommand("new", false).map(Command::name), Some("create"));
        assert!(group.find_subcommand("edit", false).is_none());
        assert!(!group.runs_before_subcommand());

        let with_callback: Command = Group::new("g")
            .callback(|_ctx, _args| async { Ok(()) })
            .command(noop("sub"))
            .into();
        assert!(with_callback.runs_before_subcommand());

        let fallback: Command = Group::new("g")
            .callback(|_ctx, _args| async { Ok(()) })
            .invoke_without_command(true)
            .command(noop("sub"))
            .into();
        assert!(!fallback.runs_before_subcommand());
    }
}
