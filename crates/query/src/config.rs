//! Compiler configuration.

use alloc::string::String;

/// Escape character used when a dialect requires LIKE escaping and the
/// statement supplies none.
pub const DEFAULT_LIKE_ESCAPE: char = '\\';

/// Request-scoped options for one compilation.
#[derive(Clone, Debug)]
pub struct CompilerConfig {
    /// Escape character synthesized for LIKE terms without one.
    pub like_escape: Option<char>,
    /// Whether every LIKE term must carry an escape operand.
    pub mandatory_like_escape: bool,
    /// Upper bound on the number of entries in any compilation arena.
    pub max_arena_nodes: usize,
    /// Whether ranges over prefix-index columns are widened to inclusive bounds.
    pub widen_prefix_ranges: bool,
    /// Value substituted for `CURRENT_USER`.
    pub current_user: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            like_escape: None,
            mandatory_like_escape: false,
            max_arena_nodes: usize::MAX,
            widen_prefix_ranges: true,
            current_user: String::from("PUBLIC"),
        }
    }
}

impl CompilerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default LIKE escape character.
    pub fn like_escape(mut self, escape: char) -> Self {
        self.like_escape = Some(escape);
        self
    }

    /// Requires an escape operand on every LIKE term.
    pub fn mandatory_like_escape(mut self, mandatory: bool) -> Self {
        self.mandatory_like_escape = mandatory;
        self
    }

    /// Caps the size of each compilation arena.
    pub fn max_arena_nodes(mut self, limit: usize) -> Self {
        self.max_arena_nodes = limit;
        self
    }

    /// Enables or disables prefix-index range widening.
    pub fn widen_prefix_ranges(mut self, widen: bool) -> Self {
        self.widen_prefix_ranges = widen;
        self
    }

    /// Sets the user name returned by `CURRENT_USER`.
    pub fn current_user(mut self, user: impl Into<String>) -> Self {
        self.current_user = user.into();
        self
    }

    /// Escape character to synthesize for a LIKE term without one, if any.
    pub fn effective_like_escape(&self) -> Option<char> {
        if self.mandatory_like_escape {
            Some(self.like_escape.unwrap_or(DEFAULT_LIKE_ESCAPE))
        } else {
            None
        }
    }
}
