use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl SourceLocation {
    pub fn new(line: usize, col: usize, end_line: usize, end_col: usize) -> Self {
        Self { line, col, end_line, end_col }
    }

    pub fn from_range(start: (usize, usize), end: (usize, usize)) -> Self {
        Self::new(start.0, start.1, end.0, end.1)
    }

    /// A zero-width location.
    pub fn point(line: usize, col: usize) -> Self {
        Self::new(line, col, line, col)
    }

    /// Translate a position relative to this location's start.
    ///
    /// `rel_line` is 1-based, `rel_col` is 0-based; columns only shift on the
    /// first line since later lines start at column zero of the host file.
    pub fn offset(&self, rel_line: usize, rel_col: usize) -> (usize, usize) {
        if rel_line <= 1 {
            (self.line, self.col + rel_col)
        } else {
            (self.line + rel_line - 1, rel_col)
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Where an unmapped foreign type appeared in a snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypePosition {
    Return,
    Argument { index: usize, name: String },
}

impl fmt::Display for TypePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Return => write!(f, "the return type"),
            Self::Argument { index, name } => write!(f, "argument {} (`{}`)", index + 1, name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("Malformed snippet: {message}")]
    Parse { message: String },

    #[error("Missing return type annotation before the snippet body")]
    MissingReturnType,

    #[error("Missing snippet body: expected `{{ ... }}` after the return type")]
    MissingBody,

    #[error("Malformed placeholder `$({text})`: {reason}")]
    MalformedPlaceholder { text: String, reason: String },

    #[error("Placeholder `{name}` declared as `{first}` and again as `{second}`")]
    ConflictingPlaceholder { name: String, first: String, second: String },

    #[error("Unterminated `[{quoter}|` quote: missing closing `|]`")]
    UnterminatedQuote { quoter: String },

    #[error("No host type registered for foreign type `{ty}` used as {position}")]
    UnmappedType { ty: String, position: TypePosition },

    #[error("Placeholder `{name}` does not name a variable in the enclosing host scope")]
    UnresolvedIdentifier { name: String },

    #[error("Active type context changed after {expanded} snippet(s) were already expanded")]
    ConfigurationOrder { expanded: usize },
}

/// A build-time failure tied to a position in a host file.
#[derive(Debug, Clone)]
pub struct ExpandError {
    pub kind: ErrorKind,
    pub location: SourceLocation,
    pub file: String,
    pub suggestions: Vec<String>,
}

impl ExpandError {
    pub fn new(kind: ErrorKind, location: SourceLocation) -> Self {
        Self {
            kind,
            location,
            file: String::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn parse(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::Parse { message: message.into() }, location)
    }

    pub fn unmapped_type(
        ty: String,
        position: TypePosition,
        location: SourceLocation,
        known: &[String],
    ) -> Self {
        let similar = find_similar_names(&ty, known, 2);
        let mut error = Self::new(ErrorKind::UnmappedType { ty, position }, location);

        if similar.is_empty() {
            error = error.with_suggestion(
                "Register a correspondence for it in the active type context".to_string(),
            );
        } else {
            let suggestions = similar
                .iter()
                .take(3)
                .map(|s| format!("Did you mean '{}'?", s))
                .collect();
            error = error.with_suggestions(suggestions);
        }

        error
    }

    pub fn unresolved_identifier(name: String, location: SourceLocation, visible: &[String]) -> Self {
        let similar = find_similar_names(&name, visible, 2);
        let mut error = Self::new(ErrorKind::UnresolvedIdentifier { name }, location);

        if !similar.is_empty() {
            let suggestions = similar
                .iter()
                .take(3)
                .map(|s| format!("Did you mean '{}'?", s))
                .collect();
            error = error.with_suggestions(suggestions);
        }

        error
    }
}

impl fmt::Display for ExpandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.file.is_empty() {
            write!(f, "{}:", self.file)?;
        }
        write!(f, "{}:{}: {}", self.location.line, self.location.col, self.kind)?;

        for suggestion in &self.suggestions {
            write!(f, "\n  hint: {}", suggestion)?;
        }

        Ok(())
    }
}

impl std::error::Error for ExpandError {}

/// Error collector for gathering every diagnostic of a unit before aborting it
pub struct ErrorCollector {
    errors: Vec<ExpandError>,
    max_errors: usize,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            max_errors: 100,
        }
    }

    pub fn with_max(max_errors: usize) -> Self {
        Self {
            errors: Vec::new(),
            max_errors,
        }
    }

    pub fn add(&mut self, error: ExpandError) {
        if self.errors.len() < self.max_errors {
            self.errors.push(error);
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[ExpandError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ExpandError> {
        self.errors
    }
}

impl Default for ErrorCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute Levenshtein distance for "did you mean" suggestions
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 { return b_len; }
    if b_len == 0 { return a_len; }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr[0] = i;
        for j in 1..=b_len {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Find similar names for "did you mean" suggestions
pub fn find_similar_names(target: &str, candidates: &[String], max_distance: usize) -> Vec<String> {
    let mut results: Vec<(String, usize)> = candidates
        .iter()
        .map(|c| (c.clone(), levenshtein_distance(target, c)))
        .filter(|(_, dist)| *dist <= max_distance && *dist > 0)
        .collect();

    results.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    results.into_iter().map(|(name, _)| name).collect()
}
