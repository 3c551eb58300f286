//! Built-in `help` command

use std::fmt::Write;
use std::sync::Arc;

use crate::args::Args;
use crate::command::{self, Command};
use crate::context::CommandContext;
use crate::error::CommandResult;

pub const HELP_NAME: &str = "help";
const HELP_BRIEF: &str = "Shows this message";

fn code_block(body: &str) -> String {
    format!("```\n{}\n```", body.trim_end())
}

fn push_entries<'a>(out: &mut String, commands: impl Iterator<Item = (&'a str, &'a str)>) {
    let entries: Vec<_> = commands.collect();
    let width = entries.iter().map(|(name, _)| name.chars().count()).max().unwrap_or(0);
    for (name, doc) in entries {
        let _ = writeln!(out, "  {name:<width$} {doc}");
    }
}

/// Every visible command, with the help command listed last
pub fn render_index(commands: &[Command], prefix: &str) -> String {
    let mut out = String::from("Commands:\n");
    let visible = commands
        .iter()
        .filter(|c| !c.is_hidden())
        .map(|c| (c.name(), c.short_doc()))
        .chain(std::iter::once((HELP_NAME, HELP_BRIEF)));
    push_entries(&mut out, visible);
    let _ = write!(
        out,
        "\nType {prefix}{HELP_NAME} command for more info on a command."
    );
    code_block(&out)
}

/// Signature, aliases, help text, and sub-commands of one command
pub fn render_command(command: &Command, qualified_name: &str, prefix: &str) -> String {
    let mut out = format!("{prefix}{qualified_name}");
    if let Some(usage) = command.usage_text() {
        let _ = write!(out, " {usage}");
    }
    out.push('\n');
    if !command.aliases().is_empty() {
        let _ = writeln!(out, "Aliases: {}", command.aliases().join(", "));
    }
    if let Some(help) = command.help_text().or(Some(command.short_doc()).filter(|d| !d.is_empty())) {
        let _ = writeln!(out, "\n{help}");
    }

    let children: Vec<_> = command
        .subcommands()
        .iter()
        .filter(|c| !c.is_hidden())
        .map(|c| (c.name(), c.short_doc()))
        .collect();
    if !children.is_empty() {
        out.push_str("\nCommands:\n");
        push_entries(&mut out, children.into_iter());
    }
    code_block(&out)
}

/// Walk `path` through groups; returns the command and its qualified name
pub fn resolve<'a>(commands: &'a [Command], path: &[String], case_insensitive: bool) -> Option<(&'a Command, String)> {
    let (first, rest) = path.split_first()?;
    let mut current = command::find(commands, first, case_insensitive)?;
    let mut qualified = current.name().to_string();
    for name in rest {
        current = current.find_subcommand(name, case_insensitive)?;
        qualified.push(' ');
        qualified.push_str(current.name());
    }
    Some((current, qualified))
}

/// Build the help command over a snapshot of the registered commands
pub(crate) fn help_command(commands: Arc<Vec<Command>>, case_insensitive: bool) -> Command {
    Command::new(HELP_NAME, move |ctx: CommandContext, mut args: Args| {
        let commands = Arc::clone(&commands);
        async move {
            let mut path = Vec::new();
            while let Some(word) = args.optional::<String>()? {
                path.push(word);
            }

            let text = if path.is_empty() {
                render_index(&commands, &ctx.prefix)
            } else {
                match resolve(&commands, &path, case_insensitive) {
                    Some((command, qualified)) if !command.is_hidden() => {
                        render_command(command, &qualified, &ctx.prefix)
                    }
                    _ => format!("No command called \"{}\" found.", path.join(" ")),
                }
            };
            ctx.send(text).await?;
            Ok(())
        }
    })
    .usage("[command]")
    .brief(HELP_BRIEF)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Group;

    fn noop(name: &str) -> Command {
        Command::new(name, |_ctx, _args| async { Ok(()) })
    }

    fn registry() -> Vec<Command> {
        vec![
            noop("ping").brief("Pong"),
            noop("secret").hidden(true),
            Group::new("tag")
                .configure(|c| c.help("Manage tags\nTags are per guild.").alias("t"))
                .command(noop("create").usage("<name> <content>").brief("Create a tag"))
                .into(),
        ]
    }

    #[test]
    fn test_index() {
        let text = render_index(&registry(), "!");
        assert_eq!(
            text,
            "```\nCommands:\n  ping Pong\n  tag  Manage tags\n  help Shows this message\n\n\
             Type !help command for more info on a command.\n```"
        );
    }

    #[test]
    fn test_command_page() {
        let commands = registry();
        let path = vec!["t".to_string(), "create".to_string()];
        let (command, qualified) = resolve(&commands, &path, false).unwrap();
        assert_eq!(qualified, "tag create");
        assert_eq!(
            render_command(command, &qualified, "?"),
            "```\n?tag create <name> <content>\n\nCreate a tag\n```"
        );

        let (group, qualified) = resolve(&commands, &["tag".to_string()], false).unwrap();
        let page = render_command(group, &qualified, "!");
        assert!(page.contains("Aliases: t"));
        assert!(page.contains("Tags are per guild."));
        assert!(page.contains("Commands:\n  create Create a tag"));
    }

    #[test]
    fn test_resolve_missing() {
        let commands = registry();
        assert!(resolve(&commands, &["nope".to_string()], false).is_none());
        assert!(resolve(&commands, &["ping".to_string(), "x".to_string()], false).is_none());
        assert!(resolve(&commands, &[], false).is_none());
    }
}
