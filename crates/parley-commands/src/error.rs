//! Command errors
//!
//! Every failure while resolving or running a command ends up as a
//! [`CommandError`] passed to the bot's error hook.

use parley_client::ClientError;
use parley_http::HttpError;
use std::time::Duration;
use thiserror::Error;

use crate::view::ViewError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command \"{0}\" is not found")]
    CommandNotFound(String),

    #[error("{0} is a required argument that is missing")]
    MissingRequiredArgument(String),

    #[error("Converting {argument:?} failed: {reason}")]
    BadArgument { argument: String, reason: String },

    #[error("Too many arguments passed to {0}")]
    TooManyArguments(String),

    /// A check rejected the invocation
    #[error("{0}")]
    CheckFailure(String),

    #[error("This command cannot be used in private messages")]
    NoPrivateMessage,

    #[error("This command can only be used in private messages")]
    PrivateMessageOnly,

    #[error("You are on cooldown. Try again in {:.2}s", retry_after.as_secs_f64())]
    CommandOnCooldown { retry_after: Duration },

    #[error("{0} command is disabled")]
    DisabledCommand(String),

    /// The command callback failed
    #[error("Command raised an exception: {0}")]
    Invoke(#[source] BoxError),
}

impl CommandError {
    pub fn bad_argument(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    pub fn check_failure(message: impl Into<String>) -> Self {
        Self::CheckFailure(message.into())
    }

    /// Wrap any error raised by a callback
    pub fn invoke(err: impl Into<BoxError>) -> Self {
        Self::Invoke(err.into())
    }

    /// Errors caused by the invoking user rather than the bot
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Invoke(_))
    }
}

impl From<ViewError> for CommandError {
    fn from(err: ViewError) -> Self {
        Self::bad_argument(err.fragment(), err.to_string())
    }
}

impl From<HttpError> for CommandError {
    fn from(err: HttpError) -> Self {
        Self::Invoke(Box::new(err))
    }
}

impl From<ClientError> for CommandError {
    fn from(err: ClientError) -> Self {
        Self::Invoke(Box::new(err))
    }
}

pub type CommandResult<T = ()> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            CommandError::CommandNotFound("foo".into()).to_string(),
            "Command \"foo\" is not found"
        );
        assert_eq!(
            CommandError::MissingRequiredArgument("member".into()).to_string(),
            "member is a required argument that is missing"
        );
        let cooldown = CommandError::CommandOnCooldown {
            retry_after: Duration::from_millis(1500),
        };
        assert_eq!(cooldown.to_string(), "You are on cooldown. Try again in 1.50s");
    }

    #[test]
    fn test_user_errors() {
        assert!(CommandError::NoPrivateMessage.is_user_error());
        assert!(!CommandError::invoke("boom").is_user_error());
        let err: CommandError = HttpError::Unauthorized.into();
        assert!(matches!(err, CommandError::Invoke(_)));
    }
}
