//! Prefix command bot
//!
//! [`Bot`] is an [`EventHandler`]: every created message goes through
//! [`Bot::process_commands`], and every event is also forwarded to an
//! optional inner handler.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parley_client::dispatch::route;
use parley_client::{Context, Event, EventHandler};
use parley_core::{Message, Snowflake};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::args::Args;
use crate::command::{self, Command};
use crate::context::CommandContext;
use crate::error::{CommandError, CommandResult};
use crate::help::{self, HELP_NAME};
use crate::view::StringView;

type PrefixFn = Arc<dyn Fn(Context, Message) -> BoxFuture<'static, Vec<String>> + Send + Sync>;
type Hook = Arc<dyn Fn(CommandContext) -> BoxFuture<'static, ()> + Send + Sync>;
type ErrorHook = Arc<dyn Fn(CommandContext, CommandError) -> BoxFuture<'static, ()> + Send + Sync>;

/// How a message must start to be treated as a command
#[derive(Clone)]
pub enum Prefix {
    Fixed(Vec<String>),
    /// Computed per message, e.g. from per-guild settings
    Dynamic(PrefixFn),
}

impl Prefix {
    pub fn dynamic<F, Fut>(f: F) -> Self
    where
        F: Fn(Context, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Vec<String>> + Send + 'static,
    {
        Self::Dynamic(Arc::new(move |ctx, message| f(ctx, message).boxed()))
    }

    async fn resolve(&self, ctx: &Context, message: &Message) -> Vec<String> {
        match self {
            Self::Fixed(prefixes) => prefixes.clone(),
            Self::Dynamic(f) => f(ctx.clone(), message.clone()).await,
        }
    }
}

impl From<&str> for Prefix {
    fn from(prefix: &str) -> Self {
        Self::Fixed(vec![prefix.to_string()])
    }
}

impl From<Vec<String>> for Prefix {
    fn from(prefixes: Vec<String>) -> Self {
        Self::Fixed(prefixes)
    }
}

impl std::fmt::Debug for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(prefixes) => f.debug_tuple("Fixed").field(prefixes).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic"),
        }
    }
}

/// Log the error; user mistakes at debug, callback failures at error
async fn log_command_error(ctx: CommandContext, err: CommandError) {
    if err.is_user_error() {
        debug!(command = %ctx.command, invoked_with = %ctx.invoked_with, error = %err, "command rejected");
    } else {
        error!(command = %ctx.command, error = %err, "command failed");
    }
}

pub struct BotBuilder {
    prefix: Prefix,
    case_insensitive: bool,
    mention_as_prefix: bool,
    help_command: bool,
    owners: HashSet<Snowflake>,
    commands: Vec<Command>,
    inner: Option<Arc<dyn EventHandler>>,
    before_invoke: Option<Hook>,
    after_invoke: Option<Hook>,
    on_error: Option<ErrorHook>,
}

impl BotBuilder {
    pub fn new(prefix: impl Into<Prefix>) -> Self {
        Self {
            prefix: prefix.into(),
            case_insensitive: false,
            mention_as_prefix: false,
            help_command: true,
            owners: HashSet::new(),
            commands: Vec::new(),
            inner: None,
            before_invoke: None,
            after_invoke: None,
            on_error: None,
        }
    }

    /// Match prefixes and command names ignoring case
    #[must_use]
    pub fn case_insensitive(mut self, value: bool) -> Self {
        self.case_insensitive = value;
        self
    }

    /// Also accept `@bot command`
    #[must_use]
    pub fn mention_as_prefix(mut self, value: bool) -> Self {
        self.mention_as_prefix = value;
        self
    }

    #[must_use]
    pub fn help_command(mut self, enabled: bool) -> Self {
        self.help_command = enabled;
        self
    }

    #[must_use]
    pub fn owner(mut self, user_id: Snowflake) -> Self {
        self.owners.insert(user_id);
        self
    }

    #[must_use]
    pub fn command(mut self, command: impl Into<Command>) -> Self {
        self.commands.push(command.into());
        self
    }

    /// Handler that receives every event alongside the bot
    #[must_use]
    pub fn event_handler<H: EventHandler>(mut self, handler: H) -> Self {
        self.inner = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn before_invoke<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.before_invoke = Some(Arc::new(move |ctx| hook(ctx).boxed()));
        self
    }

    #[must_use]
    pub fn after_invoke<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.after_invoke = Some(Arc::new(move |ctx| hook(ctx).boxed()));
        self
    }

    /// Replace the default error hook, which only logs
    #[must_use]
    pub fn on_command_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(CommandContext, CommandError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |ctx, err| hook(ctx, err).boxed()));
        self
    }

    pub fn build(self) -> Bot {
        let mut commands = self.commands;
        let has_help = command::find(&commands, HELP_NAME, self.case_insensitive).is_some();
        if self.help_command && !has_help {
            let snapshot = Arc::new(commands.clone());
            commands.push(help::help_command(snapshot, self.case_insensitive));
        }
        info!(commands = commands.len(), "command bot built");

        Bot {
            prefix: self.prefix,
            case_insensitive: self.case_insensitive,
            mention_as_prefix: self.mention_as_prefix,
            owners: Arc::new(self.owners),
            commands: Arc::new(commands),
            inner: self.inner,
            before_invoke: self.before_invoke,
            after_invoke: self.after_invoke,
            on_error: self
                .on_error
                .unwrap_or_else(|| Arc::new(|ctx: CommandContext, err: CommandError| log_command_error(ctx, err).boxed())),
        }
    }
}

/// A command bot; register it as the client's event handler
///
/// ```no_run
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// use parley_client::Client;
/// use parley_commands::{Bot, Command, CommandContext, Args};
/// use parley_common::ClientConfig;
///
/// let bot = Bot::builder("!")
///     .command(Command::new("ping", |ctx: CommandContext, _args: Args| async move {
///         ctx.reply("pong").await?;
///         Ok(())
///     }))
///     .build();
///
/// let client = Client::builder(ClientConfig::from_env()?)
///     .event_handler(bot)
///     .build()?;
/// client.start().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Bot {
    prefix: Prefix,
    case_insensitive: bool,
    mention_as_prefix: bool,
    owners: Arc<HashSet<Snowflake>>,
    commands: Arc<Vec<Command>>,
    inner: Option<Arc<dyn EventHandler>>,
    before_invoke: Option<Hook>,
    after_invoke: Option<Hook>,
    on_error: ErrorHook,
}

impl Bot {
    pub fn builder(prefix: impl Into<Prefix>) -> BotBuilder {
        BotBuilder::new(prefix)
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn command(&self, name: &str) -> Option<&Command> {
        command::find(&self.commands, name, self.case_insensitive)
    }

    /// Prefixes accepted for this message, mentions included
    async fn prefixes(&self, ctx: &Context, message: &Message) -> Vec<String> {
        let mut prefixes = self.prefix.resolve(ctx, message).await;
        if self.mention_as_prefix {
            if let Some(me) = ctx.cache.user_id() {
                prefixes.push(format!("<@{me}> "));
                prefixes.push(format!("<@!{me}> "));
            }
        }
        prefixes
    }

    fn strip_prefix<'a>(&self, content: &'a str, prefixes: &[String]) -> Option<(String, &'a str)> {
        prefixes.iter().filter(|p| !p.is_empty()).find_map(|prefix| {
            let head = content.get(..prefix.len())?;
            let matched = if self.case_insensitive {
                head.to_lowercase() == prefix.to_lowercase()
            } else {
                head == prefix
            };
            matched.then(|| (head.to_string(), &content[prefix.len()..]))
        })
    }

    /// Parse a message and run the command it names, if any
    ///
    /// Errors are passed to the error hook rather than returned.
    #[instrument(skip_all, fields(message_id = %message.id))]
    pub async fn process_commands(&self, ctx: Context, message: Message) {
        if ctx.cache.user_id() == Some(message.author.id) {
            return;
        }
        if ctx.cache.is_bot() && message.author.bot {
            return;
        }

        let prefixes = self.prefixes(&ctx, &message).await;
        let Some((prefix, body)) = self.strip_prefix(&message.content, &prefixes) else {
            return;
        };
        let mut view = StringView::new(body);
        let invoked_with = view.get_word();
        if invoked_with.is_empty() {
            return;
        }

        let mut cx = CommandContext {
            ctx,
            message,
            prefix,
            invoked_with,
            command: String::new(),
            owners: Arc::clone(&self.owners),
        };

        if let Err(err) = self.invoke(&mut cx, view).await {
            (self.on_error)(cx, err).await;
        }
    }

    async fn invoke(&self, cx: &mut CommandContext, mut view: StringView) -> CommandResult<()> {
        let mut command = command::find(&self.commands, &cx.invoked_with, self.case_insensitive)
            .ok_or_else(|| CommandError::CommandNotFound(cx.invoked_with.clone()))?;
        cx.command = command.name().to_string();

        // Descend into groups while the next word names a sub-command
        while command.is_group() {
            view.skip_ws();
            let word = view.get_word();
            let Some(child) = command.find_subcommand(&word, self.case_insensitive) else {
                view.undo();
                break;
            };

            command.prepare(cx).await?;
            if command.runs_before_subcommand() {
                let args = Args::new("", cx.convert_context());
                command.invoke(cx.clone(), args).await?;
            }
            command = child;
            cx.invoked_with = word;
            cx.command = format!("{} {}", cx.command, command.name());
        }

        command.prepare(cx).await?;
        let args = Args::from_view(view, cx.convert_context());

        debug!(command = %cx.command, author = %cx.author().id, "invoking command");
        if let Some(hook) = &self.before_invoke {
            hook(cx.clone()).await;
        }
        let result = command.invoke(cx.clone(), args).await;
        if let Some(hook) = &self.after_invoke {
            hook(cx.clone()).await;
        }
        result
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("prefix", &self.prefix)
            .field("case_insensitive", &self.case_insensitive)
            .field("mention_as_prefix", &self.mention_as_prefix)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventHandler for Bot {
    async fn on_event(&self, ctx: Context, event: &Event) {
        if let Some(inner) = &self.inner {
            inner.on_event(ctx.clone(), event).await;
            route(inner.as_ref(), ctx, event.clone()).await;
        }
    }

    async fn on_message(&self, ctx: Context, message: Message) {
        self.process_commands(ctx, message).await;
    }
}
