//! Lexical analysis: a lazy cursor over the source that yields one token per
//! call.
//!
//! The tokenizer knows nothing about statements. It never fails: bytes it
//! cannot classify come back as `Unknown` tokens and the parser decides what to
//! do with them. Compound assignments are matched with one character of
//! lookahead before falling back to the single-character operators.

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  /// `+`, `-`, `*` or `/`.
  Operator,
  /// `+=`, `-=`, `*=` or `/=`.
  CompoundAssign,
  /// `=`.
  Assign,
  /// `;`, `(`, `)`, `{` or `}`.
  Punctuator,
  Num,
  Ident,
  Unknown,
  Eof,
}

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<i64>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  pub fn new(kind: TokenKind, loc: usize, len: usize, value: Option<i64>) -> Self {
    Self {
      kind,
      value,
      loc,
      len,
    }
  }
}

/// Pull-driven tokenizer. Cloning it snapshots the cursor.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
  source: &'a str,
  pos: usize,
}

impl<'a> Lexer<'a> {
  pub fn new(source: &'a str) -> Self {
    Self { source, pos: 0 }
  }

  /// Advance past the next token and return it. Once the input is exhausted
  /// every call returns an `Eof` token anchored at the end of the source.
  pub fn next_token(&mut self) -> Token {
    let bytes = self.source.as_bytes();

    while self.pos < bytes.len() && matches!(bytes[self.pos], b' ' | b'\t' | b'\n' | b'\r')
    {
      self.pos += 1;
    }

    if self.pos >= bytes.len() {
      return Token::new(TokenKind::Eof, bytes.len(), 0, None);
    }

    let start = self.pos;
    let c = bytes[start];

    if c.is_ascii_digit() {
      let mut value: i64 = 0;
      while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
        // Overlong literals wrap rather than fail; the lexer has no error path.
        value = value
          .wrapping_mul(10)
          .wrapping_add(i64::from(bytes[self.pos] - b'0'));
        self.pos += 1;
      }
      return Token::new(TokenKind::Num, start, self.pos - start, Some(value));
    }

    if c.is_ascii_alphabetic() || c == b'_' {
      while self.pos < bytes.len()
        && (bytes[self.pos].is_ascii_alphanumeric() || bytes[self.pos] == b'_')
      {
        self.pos += 1;
      }
      return Token::new(TokenKind::Ident, start, self.pos - start, None);
    }

    if matches!(c, b'+' | b'-' | b'*' | b'/') {
      if bytes.get(start + 1) == Some(&b'=') {
        self.pos += 2;
        return Token::new(TokenKind::CompoundAssign, start, 2, None);
      }
      self.pos += 1;
      return Token::new(TokenKind::Operator, start, 1, None);
    }

    let kind = match c {
      b'=' => TokenKind::Assign,
      b';' | b'(' | b')' | b'{' | b'}' => TokenKind::Punctuator,
      _ => TokenKind::Unknown,
    };
    // Unknown characters span a whole code point so token text stays sliceable.
    let len = self.source[start..]
      .chars()
      .next()
      .map_or(1, char::len_utf8);
    self.pos += len;
    Token::new(kind, start, len, None)
  }
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: &Token, source: &str) -> String {
  match token.kind {
    TokenKind::Eof => "EOF".to_string(),
    _ => token_text(token, source).to_string(),
  }
}
