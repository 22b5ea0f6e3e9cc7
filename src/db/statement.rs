//! Statement classification by leading keyword.
//!
//! Classification only decides the response shape and metric labels. It is
//! not a validator: nothing is rejected based on it.

use std::fmt;

/// Statement kind detected from the leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Alter,
    Drop,
    Truncate,
    With,
    Explain,
    Analyze,
    Vacuum,
    Other,
}

/// Keywords in match order.
const KEYWORDS: [(&str, StatementKind); 12] = [
    ("SELECT", StatementKind::Select),
    ("INSERT", StatementKind::Insert),
    ("UPDATE", StatementKind::Update),
    ("DELETE", StatementKind::Delete),
    ("CREATE", StatementKind::Create),
    ("ALTER", StatementKind::Alter),
    ("DROP", StatementKind::Drop),
    ("TRUNCATE", StatementKind::Truncate),
    ("WITH", StatementKind::With),
    ("EXPLAIN", StatementKind::Explain),
    ("ANALYZE", StatementKind::Analyze),
    ("VACUUM", StatementKind::Vacuum),
];

impl StatementKind {
    /// Prefix match of the trimmed, uppercased statement text.
    ///
    /// `INSERT ... RETURNING` is `Insert`, and only the first statement of a
    /// multi-statement string is considered.
    pub fn detect(sql: &str) -> Self {
        let upper = sql.trim().to_uppercase();
        KEYWORDS
            .iter()
            .find(|(keyword, _)| upper.starts_with(keyword))
            .map(|(_, kind)| *kind)
            .unwrap_or(StatementKind::Other)
    }

    /// Whether the statement is answered with rows and field metadata.
    pub fn returns_rows(self) -> bool {
        matches!(self, Self::Select | Self::With | Self::Explain)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Create => "CREATE",
            Self::Alter => "ALTER",
            Self::Drop => "DROP",
            Self::Truncate => "TRUNCATE",
            Self::With => "WITH",
            Self::Explain => "EXPLAIN",
            Self::Analyze => "ANALYZE",
            Self::Vacuum => "VACUUM",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leading keyword of a statement, uppercased: the command verb reported
/// for the executed statement.
pub fn command_verb(sql: &str) -> String {
    sql.trim_start()
        .split(|c: char| c.is_whitespace() || c == ';' || c == '(')
        .next()
        .unwrap_or_default()
        .to_uppercase()
}
