//! Argument converters
//!
//! [`FromArgument`] turns one word of a command invocation into a typed
//! value. Cache-backed models resolve by id, mention, or name.

use parley_client::ConnectionState;
use parley_core::{Channel, Member, Role, Snowflake, User};
use std::sync::Arc;

/// Where an invocation happened, for converters that consult the cache
#[derive(Debug, Clone)]
pub struct ConvertContext {
    pub cache: Arc<ConnectionState>,
    pub guild_id: Option<Snowflake>,
    pub channel_id: Snowflake,
}

pub trait FromArgument: Sized {
    /// Convert `arg`, or describe why it could not be converted
    fn from_argument(arg: &str, ctx: &ConvertContext) -> Result<Self, String>;
}

macro_rules! parse_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromArgument for $ty {
                fn from_argument(arg: &str, _: &ConvertContext) -> Result<Self, String> {
                    arg.parse::<$ty>().map_err(|e| e.to_string())
                }
            }
        )*
    };
}

parse_from_str!(i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64);

impl FromArgument for String {
    fn from_argument(arg: &str, _: &ConvertContext) -> Result<Self, String> {
        Ok(arg.to_string())
    }
}

impl FromArgument for bool {
    fn from_argument(arg: &str, _: &ConvertContext) -> Result<Self, String> {
        match arg.to_lowercase().as_str() {
            "yes" | "y" | "true" | "t" | "1" | "enable" | "on" => Ok(true),
            "no" | "n" | "false" | "f" | "0" | "disable" | "off" => Ok(false),
            _ => Err(format!("{arg} is not a recognised boolean option")),
        }
    }
}

impl FromArgument for Snowflake {
    fn from_argument(arg: &str, _: &ConvertContext) -> Result<Self, String> {
        Snowflake::parse(arg).map_err(|e| e.to_string())
    }
}

fn mention_id(arg: &str, prefixes: &[&str]) -> Option<Snowflake> {
    let inner = arg.strip_prefix('<')?.strip_suffix('>')?;
    prefixes
        .iter()
        .find_map(|p| inner.strip_prefix(p))
        .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|id| Snowflake::parse(id).ok())
}

/// `<@id>` or `<@!id>`
pub fn parse_user_mention(arg: &str) -> Option<Snowflake> {
    mention_id(arg, &["@!", "@"])
}

/// `<#id>`
pub fn parse_channel_mention(arg: &str) -> Option<Snowflake> {
    mention_id(arg, &["#"])
}

/// `<@&id>`
pub fn parse_role_mention(arg: &str) -> Option<Snowflake> {
    mention_id(arg, &["@&"])
}

/// A raw id or the matching mention
fn id_or(arg: &str, mention: fn(&str) -> Option<Snowflake>) -> Option<Snowflake> {
    mention(arg).or_else(|| {
        arg.bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| Snowflake::parse(arg).ok())
            .flatten()
    })
}

impl FromArgument for Member {
    fn from_argument(arg: &str, ctx: &ConvertContext) -> Result<Self, String> {
        let not_found = || format!("Member \"{arg}\" not found");
        let guild_id = ctx.guild_id.ok_or_else(not_found)?;
        ctx.cache
            .with_guild(guild_id, |guild| match id_or(arg, parse_user_mention) {
                Some(id) => guild.member(id).cloned(),
                None => guild.member_named(arg).cloned(),
            })
            .flatten()
            .ok_or_else(not_found)
    }
}

impl FromArgument for User {
    fn from_argument(arg: &str, ctx: &ConvertContext) -> Result<Self, String> {
        let found = match id_or(arg, parse_user_mention) {
            Some(id) => ctx.cache.user(id),
            None => ctx.cache.user_named(arg).or_else(|| {
                let guild_id = ctx.guild_id?;
                ctx.cache
                    .with_guild(guild_id, |g| g.member_named(arg).map(|m| m.user.clone()))
                    .flatten()
            }),
        };
        found.ok_or_else(|| format!("User \"{arg}\" not found"))
    }
}

impl FromArgument for Channel {
    fn from_argument(arg: &str, ctx: &ConvertContext) -> Result<Self, String> {
        let found = match id_or(arg, parse_channel_mention) {
            Some(id) => ctx.cache.channel(id),
            None => {
                let name = arg.strip_prefix('#').unwrap_or(arg);
                ctx.guild_id.and_then(|guild_id| {
                    ctx.cache
                        .with_guild(guild_id, |g| {
                            g.channels
                                .values()
                                .find(|c| c.name.as_deref() == Some(name))
                                .cloned()
                        })
                        .flatten()
                })
            }
        };
        found.ok_or_else(|| format!("Channel \"{arg}\" not found"))
    }
}

impl FromArgument for Role {
    fn from_argument(arg: &str, ctx: &ConvertContext) -> Result<Self, String> {
        let not_found = || format!("Role \"{arg}\" not found");
        let guild_id = ctx.guild_id.ok_or_else(not_found)?;
        ctx.cache
            .with_guild(guild_id, |guild| match id_or(arg, parse_role_mention) {
                Some(id) => guild.role(id).cloned(),
                None => guild.role_by_name(arg).cloned(),
            })
            .flatten()
            .ok_or_else(not_found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    fn convert<T: FromArgument>(arg: &str) -> Result<T, String> {
        T::from_argument(arg, &test_utils::convert_context(true))
    }

    #[test]
    fn test_numbers() {
        assert_eq!(convert::<i32>("-5").unwrap(), -5);
        assert_eq!(convert::<u8>("255").unwrap(), 255);
        assert!(convert::<u8>("256").is_err());
        assert!((convert::<f64>("1.5").unwrap() - 1.5).abs() < f64::EPSILON);
        assert!(convert::<u64>("abc").is_err());
    }

    #[test]
    fn test_bool() {
        for yes in ["yes", "TRUE", "on", "1", "Enable"] {
            assert!(convert::<bool>(yes).unwrap(), "{yes}");
        }
        for no in ["no", "False", "off", "0"] {
            assert!(!convert::<bool>(no).unwrap(), "{no}");
        }
        assert_eq!(
            convert::<bool>("maybe").unwrap_err(),
            "maybe is not a recognised boolean option"
        );
    }

    #[test]
    fn test_mentions() {
        assert_eq!(parse_user_mention("<@42>"), Some(Snowflake::new(42)));
        assert_eq!(parse_user_mention("<@!42>"), Some(Snowflake::new(42)));
        assert_eq!(parse_user_mention("<@&42>"), None);
        assert_eq!(parse_role_mention("<@&42>"), Some(Snowflake::new(42)));
        assert_eq!(parse_channel_mention("<#42>"), Some(Snowflake::new(42)));
        assert_eq!(parse_channel_mention("<#>"), None);
        assert_eq!(parse_user_mention("42"), None);
    }

    #[test]
    fn test_member_lookup() {
        assert_eq!(convert::<Member>("<@!2>").unwrap().user.username, "alice");
        assert_eq!(convert::<Member>("2").unwrap().user.username, "alice");
        assert_eq!(convert::<Member>("Al").unwrap().id(), Snowflake::new(2));
        assert_eq!(convert::<Member>("nobody").unwrap_err(), "Member \"nobody\" not found");

        let dm = test_utils::convert_context(false);
        assert!(Member::from_argument("2", &dm).is_err());
    }

    #[test]
    fn test_user_channel_role_lookup() {
        assert_eq!(convert::<User>("alice").unwrap().id, Snowflake::new(2));
        assert_eq!(convert::<User>("<@2>").unwrap().id, Snowflake::new(2));

        assert_eq!(convert::<Channel>("<#101>").unwrap().name.as_deref(), Some("random"));
        assert_eq!(convert::<Channel>("#general").unwrap().id, Snowflake::new(100));

        assert_eq!(convert::<Role>("mod").unwrap().id, Snowflake::new(20));
        assert_eq!(convert::<Role>("<@&20>").unwrap().name, "mod");
        assert!(convert::<Role>("admin").is_err());
    }
}
