//! Read-only query guard.
//!
//! Decides whether a candidate SQL string may be sent to the database. The
//! default policy is a textual heuristic: the statement must start with
//! `SELECT` or `WITH` and must not contain a mutating keyword as a standalone
//! token. It does not understand string literals, comments, or statement
//! separators, so it is only suitable for a trusted internal tool. Strict mode
//! additionally parses the statement and requires a single pure read.

mod parser;

pub use parser::StatementInspector;

use std::fmt;

/// Keywords that mark a statement as mutating.
pub const DENYLIST: [&str; 7] = [
    "drop", "delete", "update", "insert", "alter", "create", "truncate",
];

/// Outcome of classifying a SQL string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The statement may be executed.
    Allow,
    /// The statement was refused.
    Reject(RejectReason),
}

impl Verdict {
    /// Returns true if the statement may be executed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Returns the rejection reason, if any.
    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Allow => None,
            Self::Reject(reason) => Some(reason),
        }
    }
}

/// Why the guard refused a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The statement does not start with `SELECT` or `WITH`.
    NotReadStatement {
        /// First word of the normalized statement (empty for blank input).
        leading: String,
    },
    /// A `WITH` statement that never selects anything.
    WithWithoutSelect,
    /// A denylisted keyword appeared as a standalone token.
    MutatingKeyword(&'static str),
    /// Strict mode could not parse the statement.
    Unparsable(String),
    /// Strict mode found something other than a single pure read.
    NotPureRead(String),
}

impl RejectReason {
    /// Returns the offending keyword when one is known.
    ///
    /// For a statement such as `DROP TABLE t` this is the leading keyword,
    /// provided it is on the denylist.
    pub fn keyword(&self) -> Option<&str> {
        match self {
            Self::MutatingKeyword(kw) => Some(*kw),
            Self::NotReadStatement { leading } => DENYLIST
                .iter()
                .find(|kw| **kw == leading.as_str())
                .copied(),
            _ => None,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReadStatement { leading } => match self.keyword() {
                Some(kw) => write!(f, "only SELECT/WITH allowed ('{}' is not permitted)", kw),
                None if leading.is_empty() => write!(f, "only SELECT/WITH allowed"),
                None => write!(f, "only SELECT/WITH allowed (found '{}')", leading),
            },
            Self::WithWithoutSelect => write!(f, "WITH without SELECT"),
            Self::MutatingKeyword(kw) => write!(f, "'{}' is not permitted", kw),
            Self::Unparsable(msg) => write!(f, "could not parse SQL: {}", msg),
            Self::NotPureRead(what) => write!(f, "not a pure read: {}", what),
        }
    }
}

/// Accept/reject policy applied to SQL before it reaches the database.
#[derive(Debug, Default)]
pub struct ReadOnlyGuard {
    inspector: Option<StatementInspector>,
}

impl ReadOnlyGuard {
    /// Creates a guard. With `strict` set, statements that pass the textual
    /// policy are also parsed and must be a single pure read.
    pub fn new(strict: bool) -> Self {
        Self {
            inspector: strict.then(StatementInspector::new),
        }
    }

    /// Returns true if strict parsing is enabled.
    pub fn is_strict(&self) -> bool {
        self.inspector.is_some()
    }

    /// Classifies a SQL string. The input itself is never modified.
    pub fn classify(&self, sql: &str) -> Verdict {
        match classify_text(sql) {
            Verdict::Allow => match &self.inspector {
                Some(inspector) => inspector.inspect(sql),
                None => Verdict::Allow,
            },
            rejected => rejected,
        }
    }
}

/// Applies the textual policy only.
pub fn classify_text(sql: &str) -> Verdict {
    let normalized = sql.trim().to_lowercase();

    if normalized.starts_with("with") {
        if !normalized.contains("select") {
            return Verdict::Reject(RejectReason::WithWithoutSelect);
        }
    } else if !normalized.starts_with("select") {
        let leading = normalized
            .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .next()
            .unwrap_or_default()
            .to_string();
        return Verdict::Reject(RejectReason::NotReadStatement { leading });
    }

    for keyword in DENYLIST {
        if contains_token(&normalized, keyword) {
            return Verdict::Reject(RejectReason::MutatingKeyword(keyword));
        }
    }

    Verdict::Allow
}

/// True if `keyword` appears as a whitespace-delimited token or ends the text.
fn contains_token(normalized: &str, keyword: &str) -> bool {
    normalized.ends_with(keyword) || normalized.split_ascii_whitespace().any(|t| t == keyword)
}
