//! Path whitelist for expansion output
//!
//! Paths name positions in a value tree: `a.b` for nested keys, `a[]` for
//! elements of the list under `a`, `a.()` for elements of a tuple. Each
//! pattern is a regular expression matched from the start of the path.
//! Every map key on the way down is checked, so a pattern for `a.b` only
//! takes effect when `a` itself is allowed (e.g. `a($|\.b)`). Relation keys
//! are checked under their input name, so keeping an expanded `team` means
//! allowing `team_id` and `team.<field>`.

use crate::errors::Result;
use bigleague_core::errors::{ExError, ExErrorKind};
use regex_lite::Regex;

#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    patterns: Vec<Regex>,
}

impl Whitelist {
    /// Compile a set of path patterns
    ///
    /// # Errors
    ///
    /// `ExErrorKind::InvalidInput` naming the first pattern that does not
    /// compile.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(&format!("^(?:{})", p)).map_err(|e| {
                    ExError::new(ExErrorKind::InvalidInput)
                        .with_op("whitelist")
                        .with_message(format!("invalid whitelist pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// An empty whitelist allows every path
    pub fn allows(&self, path: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|re| re.is_match(path))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
