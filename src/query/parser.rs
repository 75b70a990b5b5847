// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query language parser.
//!
//! Grammar, loosest binding first: `OR`, `AND` (implicit between adjacent
//! operands), `NOT`. Quoted runs are phrase leaves, a trailing `*` marks a
//! prefix term, parentheses group. Operators are case-insensitive.
//!
//! The parser is total over its error states: empty input, unbalanced
//! quotes, unbalanced parentheses, and dangling operators each map to a
//! distinct [`SearchError::Parse`] reason.

use crate::errors::SearchError;

/// Boolean query tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryAst {
    Term { text: String, prefix: bool },
    Phrase(String),
    And(Box<QueryAst>, Box<QueryAst>),
    Or(Box<QueryAst>, Box<QueryAst>),
    Not(Box<QueryAst>),
}

/// Outcome of parsing one raw query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub ast: QueryAst,
    /// The query rendered in the index's syntax, fully parenthesized so
    /// precedence survives regardless of the engine's associativity.
    pub index_query: String,
    /// The first quoted phrase. Only this one drives the phrase bonus;
    /// later quoted phrases are still searched as phrase terms.
    pub phrase: Option<String>,
    /// Bare term texts plus each phrase text as one multi-word term,
    /// in query order. Input to the field matcher.
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Term { text: String, prefix: bool },
    Phrase(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

pub fn parse(raw: &str) -> Result<ParsedQuery, SearchError> {
    if raw.trim().is_empty() {
        return Err(SearchError::parse("empty query"));
    }

    let tokens = lex(raw)?;
    if tokens.is_empty() {
        return Err(SearchError::parse("empty query"));
    }

    let phrase = tokens.iter().find_map(|t| match t {
        Token::Phrase(p) => Some(p.clone()),
        _ => None,
    });
    let terms = tokens
        .iter()
        .filter_map(|t| match t {
            Token::Term { text, .. } => Some(text.clone()),
            Token::Phrase(p) => Some(p.clone()),
            _ => None,
        })
        .collect();

    let mut parser = Parser { tokens, pos: 0 };
    let ast = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(SearchError::parse("unbalanced parentheses"));
    }

    let index_query = render(&ast);
    Ok(ParsedQuery {
        ast,
        index_query,
        phrase,
        terms,
    })
}

fn lex(raw: &str) -> Result<Vec<Token>, SearchError> {
    let mut tokens = Vec::new();
    let mut chars = raw.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '"' => {
                chars.next();
                let mut phrase = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    phrase.push(c);
                }
                if !closed {
                    return Err(SearchError::parse("unbalanced quotes"));
                }
                let phrase = phrase.trim();
                if !phrase.is_empty() {
                    tokens.push(Token::Phrase(phrase.to_string()));
                }
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '"' || c == '(' || c == ')' {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                if let Some(token) = classify(&word) {
                    tokens.push(token);
                }
            }
        }
    }

    Ok(tokens)
}

fn classify(word: &str) -> Option<Token> {
    if word.eq_ignore_ascii_case("and") {
        return Some(Token::And);
    }
    if word.eq_ignore_ascii_case("or") {
        return Some(Token::Or);
    }
    if word.eq_ignore_ascii_case("not") {
        return Some(Token::Not);
    }

    let text = word.trim_end_matches('*');
    if text.is_empty() {
        // A bare `*` (or a run of them) matches nothing meaningful.
        return None;
    }
    Some(Token::Term {
        text: text.to_string(),
        prefix: text.len() != word.len(),
    })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<QueryAst, SearchError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.next();
            let right = self.parse_and()?;
            left = QueryAst::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<QueryAst, SearchError> {
        let mut left = self.parse_not()?;
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.next();
                    let right = self.parse_not()?;
                    left = QueryAst::And(Box::new(left), Box::new(right));
                }
                // Two operands with no operator between them: implicit AND.
                Some(Token::Term { .. })
                | Some(Token::Phrase(_))
                | Some(Token::Not)
                | Some(Token::LParen) => {
                    let right = self.parse_not()?;
                    left = QueryAst::And(Box::new(left), Box::new(right));
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<QueryAst, SearchError> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.next();
            let child = self.parse_not()?;
            return Ok(QueryAst::Not(Box::new(child)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<QueryAst, SearchError> {
        match self.next() {
            Some(Token::Term { text, prefix }) => Ok(QueryAst::Term { text, prefix }),
            Some(Token::Phrase(p)) => Ok(QueryAst::Phrase(p)),
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err(SearchError::parse("unbalanced parentheses")),
                }
            }
            Some(Token::RParen) => Err(SearchError::parse("unbalanced parentheses")),
            Some(Token::And) | Some(Token::Or) | Some(Token::Not) | None => {
                Err(SearchError::parse("dangling operator"))
            }
        }
    }
}

/// Render the tree in the index's query syntax. Every binary node is
/// parenthesized explicitly.
fn render(ast: &QueryAst) -> String {
    match ast {
        QueryAst::Term { text, prefix } => {
            if *prefix {
                format!("{text}*")
            } else {
                text.clone()
            }
        }
        QueryAst::Phrase(p) => format!("\"{p}\""),
        QueryAst::And(l, r) => format!("({} AND {})", render(l), render(r)),
        QueryAst::Or(l, r) => format!("({} OR {})", render(l), render(r)),
        QueryAst::Not(c) => format!("(NOT {})", render(c)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_query(raw: &str) -> String {
        parse(raw).unwrap().index_query
    }

    fn parse_err(raw: &str) -> String {
        match parse(raw).unwrap_err() {
            SearchError::Parse(reason) => reason,
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn empty_query_fails() {
        assert_eq!(parse_err(""), "empty query");
        assert_eq!(parse_err("   \t "), "empty query");
    }

    #[test]
    fn quotes_only_query_is_empty() {
        assert_eq!(parse_err("\"\""), "empty query");
    }

    #[test]
    fn single_term() {
        let parsed = parse("education").unwrap();
        assert_eq!(
            parsed.ast,
            QueryAst::Term {
                text: "education".into(),
                prefix: false
            }
        );
        assert_eq!(parsed.index_query, "education");
        assert_eq!(parsed.phrase, None);
        assert_eq!(parsed.terms, vec!["education"]);
    }

    #[test]
    fn trailing_star_marks_prefix_and_is_stripped() {
        let parsed = parse("educat*").unwrap();
        assert_eq!(
            parsed.ast,
            QueryAst::Term {
                text: "educat".into(),
                prefix: true
            }
        );
        assert_eq!(parsed.index_query, "educat*");
        assert_eq!(parsed.terms, vec!["educat"]);
    }

    #[test]
    fn implicit_and_between_bare_terms() {
        assert_eq!(index_query("black mountain"), "(black AND mountain)");
    }

    #[test]
    fn or_binds_looser_than_and() {
        assert_eq!(
            index_query("art OR craft AND school"),
            "(art OR (craft AND school))"
        );
    }

    #[test]
    fn not_binds_tightest() {
        assert_eq!(
            index_query("school AND NOT college OR art"),
            "((school AND (NOT college)) OR art)"
        );
    }

    #[test]
    fn operators_are_case_insensitive() {
        assert_eq!(index_query("a and b or not c"), "((a AND b) OR (NOT c))");
    }

    #[test]
    fn parentheses_group() {
        assert_eq!(
            index_query("(art OR craft) AND school"),
            "((art OR craft) AND school)"
        );
    }

    #[test]
    fn first_quoted_phrase_is_designated() {
        let parsed = parse("\"Black Mountain College\" AND \"John Cage\"").unwrap();
        assert_eq!(parsed.phrase.as_deref(), Some("Black Mountain College"));
        assert_eq!(
            parsed.index_query,
            "(\"Black Mountain College\" AND \"John Cage\")"
        );
        assert_eq!(parsed.terms, vec!["Black Mountain College", "John Cage"]);
    }

    #[test]
    fn phrase_mixed_with_terms() {
        let parsed = parse("\"Black Mountain College\" education*").unwrap();
        assert_eq!(parsed.phrase.as_deref(), Some("Black Mountain College"));
        assert_eq!(
            parsed.index_query,
            "(\"Black Mountain College\" AND education*)"
        );
    }

    #[test]
    fn dangling_operator_fails() {
        assert_eq!(parse_err("education AND"), "dangling operator");
        assert_eq!(parse_err("NOT"), "dangling operator");
        assert_eq!(parse_err("OR craft"), "dangling operator");
        assert_eq!(parse_err("a AND OR b"), "dangling operator");
    }

    #[test]
    fn unbalanced_quotes_fail() {
        assert_eq!(parse_err("\"black mountain"), "unbalanced quotes");
        assert_eq!(parse_err("art \"craft\" \"school"), "unbalanced quotes");
    }

    #[test]
    fn unbalanced_parentheses_fail() {
        assert_eq!(parse_err("(art OR craft"), "unbalanced parentheses");
        assert_eq!(parse_err("art) OR craft"), "unbalanced parentheses");
    }

    #[test]
    fn double_negation_parses() {
        assert_eq!(index_query("NOT NOT art"), "(NOT (NOT art))");
    }

    #[test]
    fn parse_is_deterministic() {
        let a = parse("\"exact phrase\" AND term* OR NOT other").unwrap();
        let b = parse("\"exact phrase\" AND term* OR NOT other").unwrap();
        assert_eq!(a, b);
    }
}
