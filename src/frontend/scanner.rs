//! Quasi-quote discovery in host source
//!
//! Finds `[quoter| ... |]` regions, skipping host comments and string
//! literals. The body runs up to the first `|]`; snippets cannot contain that
//! sequence.

use crate::errors::{ErrorKind, ExpandError, SourceLocation};
use crate::frontend::location::LineIndex;
use std::ops::Range;

/// Comment delimiters of the host language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax {
    pub line: &'static str,
    pub block: Option<(&'static str, &'static str)>,
    pub nested_blocks: bool,
}

/// One quasi-quote found in a host file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteSite<'a> {
    pub quoter: &'a str,
    pub body: &'a str,
    /// The whole quote, brackets included.
    pub span: Range<usize>,
    pub location: SourceLocation,
    /// Where the body text starts, used to place diagnostics inside it.
    pub body_location: SourceLocation,
}

pub fn scan_quotes<'a>(
    source: &'a str,
    comments: CommentSyntax,
    is_quoter: impl Fn(&str) -> bool,
) -> Result<Vec<QuoteSite<'a>>, ExpandError> {
    let index = LineIndex::new(source);
    let mut sites = Vec::new();
    let mut block_depth = 0usize;
    let mut i = 0;

    while i < source.len() {
        let rest = &source[i..];

        if block_depth > 0 {
            if let Some((open, close)) = comments.block {
                if comments.nested_blocks && rest.starts_with(open) {
                    block_depth += 1;
                    i += open.len();
                    continue;
                }
                if rest.starts_with(close) {
                    block_depth -= 1;
                    i += close.len();
                    continue;
                }
            }
            i += char_len(rest);
            continue;
        }

        if let Some((open, _)) = comments.block {
            if rest.starts_with(open) {
                block_depth = 1;
                i += open.len();
                continue;
            }
        }

        if starts_line_comment(rest, comments.line) {
            i += rest.find('\n').unwrap_or(rest.len());
            continue;
        }

        if rest.starts_with('\'') {
            let after_name = source[..i]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '\'');
            i += if after_name { 1 } else { char_literal_len(rest).unwrap_or(1) };
            continue;
        }

        if rest.starts_with('"') {
            i += string_len(rest);
            continue;
        }

        if rest.starts_with('[') {
            if let Some(site) = quote_at(source, i, &index, &is_quoter)? {
                i = site.span.end;
                sites.push(site);
                continue;
            }
        }

        i += char_len(rest);
    }

    Ok(sites)
}

fn quote_at<'a>(
    source: &'a str,
    start: usize,
    index: &LineIndex<'_>,
    is_quoter: &impl Fn(&str) -> bool,
) -> Result<Option<QuoteSite<'a>>, ExpandError> {
    let after_bracket = start + 1;
    let name_len = source[after_bracket..]
        .char_indices()
        .find(|&(pos, ch)| {
            let ok = if pos == 0 {
                ch.is_ascii_alphabetic() || ch == '_'
            } else {
                ch.is_ascii_alphanumeric() || ch == '_' || ch == '\''
            };
            !ok
        })
        .map(|(pos, _)| pos)
        .unwrap_or(source.len() - after_bracket);

    if name_len == 0 {
        return Ok(None);
    }
    let quoter = &source[after_bracket..after_bracket + name_len];
    let bar = after_bracket + name_len;
    if !source[bar..].starts_with('|') || !is_quoter(quoter) {
        return Ok(None);
    }

    let body_start = bar + 1;
    let body_len = match source[body_start..].find("|]") {
        Some(len) => len,
        None => {
            return Err(ExpandError::new(
                ErrorKind::UnterminatedQuote { quoter: quoter.to_string() },
                index.location(start..body_start),
            ));
        }
    };
    let body_end = body_start + body_len;
    let end = body_end + 2;

    let (body_line, body_col) = index.offset_to_position(body_start);
    Ok(Some(QuoteSite {
        quoter,
        body: &source[body_start..body_end],
        span: start..end,
        location: index.location(start..end),
        body_location: SourceLocation::point(body_line, body_col),
    }))
}

fn char_len(rest: &str) -> usize {
    rest.chars().next().map(char::len_utf8).unwrap_or(1)
}

/// `--` starts a comment only when not part of a longer operator like `-->`.
fn starts_line_comment(rest: &str, marker: &str) -> bool {
    if marker.is_empty() || !rest.starts_with(marker) {
        return false;
    }
    let repeat = marker.chars().last().unwrap_or('-');
    let after = rest[marker.len()..].trim_start_matches(repeat);
    match after.chars().next() {
        Some(ch) => !is_operator_symbol(ch),
        None => true,
    }
}

fn is_operator_symbol(ch: char) -> bool {
    "!#$%&*+./<=>?@\\^|~:".contains(ch)
}

/// Length of a character literal such as `'x'`, `'\''` or `'\n'` at the start
/// of `rest`. A lone `'` (type-level promotion, a prime) gives `None`.
fn char_literal_len(rest: &str) -> Option<usize> {
    let mut chars = rest.char_indices().skip(1);
    match chars.next()? {
        (_, '\n') => None,
        (_, '\\') => chars
            .take(10)
            .take_while(|&(_, ch)| ch != '\n')
            .skip(1)
            .find(|&(_, ch)| ch == '\'')
            .map(|(pos, _)| pos + 1),
        (_, _) => match chars.next()? {
            (pos, '\'') => Some(pos + 1),
            _ => None,
        },
    }
}

fn string_len(rest: &str) -> usize {
    let mut chars = rest.char_indices().skip(1);
    while let Some((pos, ch)) = chars.next() {
        match ch {
            '\\' => {
                chars.next();
            }
            '"' => return pos + 1,
            '\n' => return pos,
            _ => {}
        }
    }
    rest.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASKELL: CommentSyntax = CommentSyntax {
        line: "--",
        block: Some(("{-", "-}")),
        nested_blocks: true,
    };

    fn rust_quoter(name: &str) -> bool {
        name.starts_with("rust")
    }

    #[test]
    fn test_finds_quotes_in_order() {
        let src = "main = do\n  x <- [rustIO| i32 { 1 } |]\n  print [rust| i32 { 2 } |]\n";
        let sites = scan_quotes(src, HASKELL, rust_quoter).unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].quoter, "rustIO");
        assert_eq!(sites[0].body, " i32 { 1 } ");
        assert_eq!(&src[sites[0].span.clone()], "[rustIO| i32 { 1 } |]");
        assert_eq!((sites[0].location.line, sites[0].location.col), (2, 7));
        assert_eq!((sites[0].body_location.line, sites[0].body_location.col), (2, 15));
        assert_eq!(sites[1].quoter, "rust");
    }

    #[test]
    fn test_skips_comments_and_strings() {
        let src = "-- [rust| i32 { 0 } |]\n{- [rust| {- nested -} |] -}\ns = \"[rust| no |]\"\nx = [rust| i32 { 3 } |]";
        let sites = scan_quotes(src, HASKELL, rust_quoter).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].body, " i32 { 3 } ");
    }

    #[test]
    fn test_char_literals_do_not_open_strings() {
        let src = "f = ('\"', [rust| i32 { 1 } |])\ng = ['\\'', '\\\"'] ++ [rust| i32 { 2 } |]\nh x' = x' + [rust| i32 { 3 } |]\n";
        let sites = scan_quotes(src, HASKELL, rust_quoter).unwrap();
        let bodies: Vec<&str> = sites.iter().map(|s| s.body).collect();
        assert_eq!(bodies, vec![" i32 { 1 } ", " i32 { 2 } ", " i32 { 3 } "]);
        assert_eq!(sites[0].location.line, 1);
        assert_eq!(sites[0].location.col, 10);
    }

    #[test]
    fn test_operator_dashes_are_not_comments() {
        let src = "a --> [rust| () { } |]";
        let sites = scan_quotes(src, HASKELL, rust_quoter).unwrap();
        assert_eq!(sites.len(), 1);
    }

    #[test]
    fn test_ignores_list_comprehensions_and_unknown_quoters() {
        let src = "ys = [x|x<-xs]\nz = [sql| select 1 |]";
        let sites = scan_quotes(src, HASKELL, rust_quoter).unwrap();
        assert!(sites.is_empty());
    }

    #[test]
    fn test_unterminated_quote() {
        let err = scan_quotes("x = [rust| i32 { 1 }", HASKELL, rust_quoter).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnterminatedQuote { ref quoter } if quoter == "rust"));
        assert_eq!((err.location.line, err.location.col), (1, 4));
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let src = "s = \"a \\\" [rust| x |]\"\n";
        assert!(scan_quotes(src, HASKELL, rust_quoter).unwrap().is_empty());
    }
}
