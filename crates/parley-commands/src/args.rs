//! Typed access to a command's arguments

use crate::converters::{ConvertContext, FromArgument};
use crate::error::{CommandError, CommandResult};
use crate::view::StringView;

/// The text after the command name, consumed one argument at a time
#[derive(Debug, Clone)]
pub struct Args {
    view: StringView,
    ctx: ConvertContext,
}

impl Args {
    pub fn new(text: &str, ctx: ConvertContext) -> Self {
        Self {
            view: StringView::new(text),
            ctx,
        }
    }

    pub(crate) fn from_view(view: StringView, ctx: ConvertContext) -> Self {
        Self { view, ctx }
    }

    #[inline]
    pub fn convert_context(&self) -> &ConvertContext {
        &self.ctx
    }

    fn next_word(&mut self) -> CommandResult<Option<String>> {
        self.view.skip_ws();
        Ok(self.view.get_quoted_word()?)
    }

    /// A required argument; `name` is reported when it is missing
    pub fn single<T: FromArgument>(&mut self, name: &str) -> CommandResult<T> {
        let word = self
            .next_word()?
            .ok_or_else(|| CommandError::MissingRequiredArgument(name.to_string()))?;
        T::from_argument(&word, &self.ctx).map_err(|reason| CommandError::bad_argument(word, reason))
    }

    /// An argument that may be absent or of another type
    ///
    /// A word that fails to convert is left for the next read.
    pub fn optional<T: FromArgument>(&mut self) -> CommandResult<Option<T>> {
        let Some(word) = self.next_word()? else {
            return Ok(None);
        };
        match T::from_argument(&word, &self.ctx) {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                self.view.undo();
                Ok(None)
            }
        }
    }

    /// Like [`optional`](Self::optional) with a fallback
    pub fn optional_or<T: FromArgument>(&mut self, default: T) -> CommandResult<T> {
        Ok(self.optional()?.unwrap_or(default))
    }

    /// Consume as many arguments as convert, stopping at the first that does not
    pub fn greedy<T: FromArgument>(&mut self) -> CommandResult<Vec<T>> {
        let mut values = Vec::new();
        while let Some(value) = self.optional()? {
            values.push(value);
        }
        Ok(values)
    }

    /// The rest of the input as one string, quotes kept
    pub fn rest(&mut self, name: &str) -> CommandResult<String> {
        self.view.skip_ws();
        let rest = self.view.rest();
        if rest.is_empty() {
            return Err(CommandError::MissingRequiredArgument(name.to_string()));
        }
        Ok(rest)
    }

    /// The rest of the input converted as a single value
    pub fn rest_as<T: FromArgument>(&mut self, name: &str) -> CommandResult<T> {
        let rest = self.rest(name)?;
        T::from_argument(&rest, &self.ctx).map_err(|reason| CommandError::bad_argument(rest, reason))
    }

    /// Unconsumed input, without consuming it
    pub fn remaining(&self) -> String {
        self.view.remaining().trim().to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.view.remaining().trim().is_empty()
    }

    /// Fail with `TooManyArguments` when input is left over
    pub fn finish(&self, command: &str) -> CommandResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CommandError::TooManyArguments(command.to_string()))
        }
    }
}
