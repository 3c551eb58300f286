//! Cursor over a command's text
//!
//! Words are separated by whitespace. A word starting with a quote runs until
//! the matching closing quote; inside it a backslash escapes a quote or
//! another backslash.

use thiserror::Error;

/// Opening quote and its closing counterpart
const QUOTES: &[(char, char)] = &[
    ('"', '"'),
    ('\u{2018}', '\u{2019}'), // ‘ ’
    ('\u{201A}', '\u{201B}'), // ‚ ‛
    ('\u{201C}', '\u{201D}'), // “ ”
    ('\u{201E}', '\u{201F}'), // „ ‟
    ('\u{2E42}', '\u{2E42}'), // ⹂
    ('\u{300C}', '\u{300D}'), // 「 」
    ('\u{300E}', '\u{300F}'), // 『 』
    ('\u{301D}', '\u{301E}'), // 〝 〞
    ('\u{FE41}', '\u{FE42}'), // ﹁ ﹂
    ('\u{FE43}', '\u{FE44}'), // ﹃ ﹄
    ('\u{FF02}', '\u{FF02}'), // ＂
    ('\u{FF62}', '\u{FF63}'), // ｢ ｣
    ('\u{00AB}', '\u{00BB}'), // « »
    ('\u{2039}', '\u{203A}'), // ‹ ›
    ('\u{300A}', '\u{300B}'), // 《 》
    ('\u{3008}', '\u{3009}'), // 〈 〉
];

fn closing_quote(open: char) -> Option<char> {
    QUOTES.iter().find(|(o, _)| *o == open).map(|(_, c)| *c)
}

fn is_quote(c: char) -> bool {
    QUOTES.iter().any(|(o, c2)| *o == c || *c2 == c)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("Expected closing {0}.")]
    ExpectedClosingQuote(char),

    #[error("Expected space after closing quotation but received {0:?}")]
    InvalidEndOfQuotedString(char),

    #[error("Unexpected quote mark, {0:?}, in non-quoted string")]
    UnexpectedQuote(char),
}

impl ViewError {
    /// Text to show as the offending argument
    pub fn fragment(&self) -> String {
        match self {
            Self::ExpectedClosingQuote(c) | Self::InvalidEndOfQuotedString(c) | Self::UnexpectedQuote(c) => {
                c.to_string()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct StringView {
    buffer: Vec<char>,
    index: usize,
    previous: usize,
}

impl StringView {
    pub fn new(text: &str) -> Self {
        Self {
            buffer: text.chars().collect(),
            index: 0,
            previous: 0,
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.index >= self.buffer.len()
    }

    /// Step back to where the last read started
    pub fn undo(&mut self) {
        self.index = self.previous;
    }

    /// Skip whitespace; returns whether any was skipped
    pub fn skip_ws(&mut self) -> bool {
        let start = self.index;
        while self.buffer.get(self.index).is_some_and(|c| c.is_whitespace()) {
            self.index += 1;
        }
        self.previous = start;
        self.index != start
    }

    /// Consume `prefix` if the remaining text starts with it
    pub fn skip_string(&mut self, prefix: &str) -> bool {
        let prefix: Vec<char> = prefix.chars().collect();
        if self.buffer[self.index..].starts_with(&prefix) {
            self.previous = self.index;
            self.index += prefix.len();
            return true;
        }
        false
    }

    /// The next whitespace-delimited word, without quote handling
    pub fn get_word(&mut self) -> String {
        let start = self.index;
        let mut end = start;
        while self.buffer.get(end).is_some_and(|c| !c.is_whitespace()) {
            end += 1;
        }
        self.previous = start;
        self.index = end;
        self.buffer[start..end].iter().collect()
    }

    /// The next argument, honouring quotes and escapes
    ///
    /// Returns `None` at the end of input.
    pub fn get_quoted_word(&mut self) -> Result<Option<String>, ViewError> {
        let start = self.index;
        let Some(&first) = self.buffer.get(self.index) else {
            return Ok(None);
        };
        self.previous = start;

        let close = closing_quote(first);
        let mut result = String::new();
        if close.is_some() {
            self.index += 1;
        }

        loop {
            let Some(&current) = self.buffer.get(self.index) else {
                if let Some(close) = close {
                    return Err(ViewError::ExpectedClosingQuote(close));
                }
                return Ok(Some(result));
            };
            self.index += 1;

            if current == '\\' {
                match self.buffer.get(self.index) {
                    None => {
                        if let Some(close) = close {
                            return Err(ViewError::ExpectedClosingQuote(close));
                        }
                        result.push(current);
                        return Ok(Some(result));
                    }
                    Some(&next) if next == '\\' || is_quote(next) => {
                        self.index += 1;
                        result.push(next);
                    }
                    Some(_) => result.push(current),
                }
                continue;
            }

            if close.is_none() && is_quote(current) {
                return Err(ViewError::UnexpectedQuote(current));
            }

            if Some(current) == close {
                match self.buffer.get(self.index) {
                    None => return Ok(Some(result)),
                    Some(next) if next.is_whitespace() => return Ok(Some(result)),
                    Some(&next) => return Err(ViewError::InvalidEndOfQuotedString(next)),
                }
            }

            if current.is_whitespace() && close.is_none() {
                self.index -= 1;
                return Ok(Some(result));
            }

            result.push(current);
        }
    }

    /// Everything not yet consumed, trimmed
    pub fn rest(&mut self) -> String {
        let rest: String = self.buffer[self.index..].iter().collect();
        self.previous = self.index;
        self.index = self.buffer.len();
        rest.trim().to_string()
    }

    /// Remaining text without consuming it
    pub fn remaining(&self) -> String {
        self.buffer[self.index..].iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Result<Vec<String>, ViewError> {
        let mut view = StringView::new(text);
        let mut words = Vec::new();
        loop {
            view.skip_ws();
            match view.get_quoted_word()? {
                Some(word) => words.push(word),
                None => return Ok(words),
            }
        }
    }

    #[test]
    fn test_plain_words() {
        assert_eq!(words("  a bc\td  ").unwrap(), vec!["a", "bc", "d"]);
    }

    #[test]
    fn test_quoted() {
        assert_eq!(words(r#"say "hello world" x"#).unwrap(), vec!["say", "hello world", "x"]);
        assert_eq!(words("«a b» “c d”").unwrap(), vec!["a b", "c d"]);
    }

    #[test]
    fn test_escapes() {
        assert_eq!(words(r#""a \"b\" c""#).unwrap(), vec![r#"a "b" c"#]);
        assert_eq!(words(r"a\b").unwrap(), vec![r"a\b"]);
        assert_eq!(words(r"a\\b").unwrap(), vec![r"a\b"]);
    }

    #[test]
    fn test_quote_errors() {
        assert_eq!(words(r#""open"#).unwrap_err(), ViewError::ExpectedClosingQuote('"'));
        assert_eq!(
            words(r#""a"b"#).unwrap_err(),
            ViewError::InvalidEndOfQuotedString('b')
        );
        assert_eq!(words(r#"ab"c"#).unwrap_err(), ViewError::UnexpectedQuote('"'));
    }

    #[test]
    fn test_rest_and_undo() {
        let mut view = StringView::new("cmd  some remaining text ");
        assert_eq!(view.get_word(), "cmd");
        view.skip_ws();
        assert_eq!(view.get_quoted_word().unwrap().as_deref(), Some("some"));
        view.undo();
        assert_eq!(view.rest(), "some remaining text");
        assert!(view.is_eof());
    }

    #[test]
    fn test_skip_string() {
        let mut view = StringView::new("!!ping");
        assert!(!view.skip_string("?"));
        assert!(view.skip_string("!!"));
        assert_eq!(view.get_word(), "ping");
    }
}
