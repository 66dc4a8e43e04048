use indexmap::IndexSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Operator,
    Number,
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub value: &'a str,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, value: &'a str) -> Self {
        Self { kind, value }
    }
    pub fn is_punct(&self, value: &str) -> bool {
        self.kind == TokenKind::Punct && self.value == value
    }
    pub fn is_operator(&self, value: &str) -> bool {
        self.kind == TokenKind::Operator && self.value == value
    }
}

const OPERATORS: &[char] = &['+', '-', '*', '/', '^'];

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Length of the number literal at the start of `text`, if there is one.
///
/// Accepts `12`, `1.5`, `1.`, `.5` and an optional exponent (`1e-3`). An `e` that
/// is not followed by digits is left for the identifier rule.
fn number_len(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };
    let mut end = digits_from(0);
    let has_integer_part = end > 0;
    if end < bytes.len() && bytes[end] == b'.' {
        let fraction_end = digits_from(end + 1);
        if !has_integer_part && fraction_end == end + 1 {
            return None;
        }
        end = fraction_end;
    } else if !has_integer_part {
        return None;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut i = end + 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exponent_end = digits_from(i);
        if exponent_end > i {
            end = exponent_end;
        }
    }
    Some(end)
}

/// Split a mathematical expression into tokens.
///
/// Never fails: whitespace is dropped and any character that is not part of an
/// identifier, number or operator becomes a single [`TokenKind::Punct`] token, so
/// that the token stream reproduces the expression verbatim.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while let Some(c) = text[pos..].chars().next() {
        let rest = &text[pos..];
        let len = if c.is_whitespace() {
            c.len_utf8()
        } else if let Some(len) = number_len(rest) {
            tokens.push(Token::new(TokenKind::Number, &rest[..len]));
            len
        } else if is_identifier_start(c) {
            let len = rest
                .find(|c: char| !is_identifier_continue(c))
                .unwrap_or(rest.len());
            tokens.push(Token::new(TokenKind::Identifier, &rest[..len]));
            len
        } else if OPERATORS.contains(&c) {
            tokens.push(Token::new(TokenKind::Operator, &rest[..1]));
            1
        } else {
            let len = c.len_utf8();
            tokens.push(Token::new(TokenKind::Punct, &rest[..len]));
            len
        };
        pos += len;
    }
    tokens
}

/// The symbols an expression reads, in order of first appearance.
///
/// Numbers and operators are never included, nor are identifiers used as
/// function names (directly followed by `(`).
pub fn identifier_names(text: &str) -> IndexSet<String> {
    let tokens = tokenize(text);
    tokens
        .iter()
        .enumerate()
        .filter(|(i, token)| {
            token.kind == TokenKind::Identifier
                && !tokens.get(i + 1).is_some_and(|next| next.is_punct("("))
        })
        .map(|(_, token)| token.value.to_string())
        .collect()
}
