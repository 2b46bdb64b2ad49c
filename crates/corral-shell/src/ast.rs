//! Parsed representation of a script.

/// A parsed script ready to be handed to [`crate::Runner::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    pub(crate) items: Vec<AndOr>,
}

impl Script {
    /// Returns true when the script contains no commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of top-level command lists in the script.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Pipelines joined by `&&` and `||`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AndOr {
    pub(crate) first: Pipeline,
    pub(crate) rest: Vec<(Connector, Pipeline)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Connector {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Pipeline {
    pub(crate) negated: bool,
    pub(crate) commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Simple(SimpleCommand),
    Subshell {
        body: Script,
        redirects: Vec<Redirect>,
    },
    Group {
        body: Script,
        redirects: Vec<Redirect>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SimpleCommand {
    pub(crate) assignments: Vec<Assignment>,
    pub(crate) words: Vec<Word>,
    pub(crate) redirects: Vec<Redirect>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Assignment {
    pub(crate) name: String,
    pub(crate) value: Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Redirect {
    pub(crate) fd: u8,
    pub(crate) target: RedirectTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RedirectTarget {
    Read(Word),
    Write(Word),
    Append(Word),
    /// Duplicate another descriptor, as in `2>&1`.
    Duplicate(u8),
}

/// A shell word before expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Word {
    pub(crate) parts: Vec<WordPart>,
}

impl Word {
    /// Returns the literal text when the word is a single unquoted literal.
    pub(crate) fn as_literal(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [WordPart::Literal(text)] => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WordPart {
    /// Unquoted text; subject to pathname expansion.
    Literal(String),
    /// Text protected from every expansion (single quotes or a backslash).
    Quoted(String),
    /// Double-quoted section: parameters expand, nothing else does.
    DoubleQuoted(Vec<WordPart>),
    Param(Param),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Param {
    pub(crate) name: String,
    /// Replacement used by `${NAME:-default}` when the value is unset or empty.
    pub(crate) fallback: Option<Word>,
}
