//! Recursive-descent parser producing a statement list and expression AST.
//!
//! The grammar is a precedence-climbing pair of helpers under a thin statement
//! layer:
//!
//! ```text
//! program   := stmt*
//! stmt      := ident "=" add ";"?
//! add       := mul (("+" | "-") mul)*
//! mul       := primary (("*" | "/") primary)*
//! primary   := num | ident
//! ```
//!
//! Every node of one compilation lives in the [`Program`]'s arena and is
//! released with it. Statements that fail to parse are not reported: the
//! parser rewinds to the token that started the statement, drops that token
//! and tries again, so malformed input can only ever shrink the program.

use std::fmt;

use id_arena::{Arena, Id};
use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Lexer, Token, TokenKind, describe_token, token_text};

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
}

impl fmt::Display for BinaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let symbol = match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
    };
    f.write_str(symbol)
  }
}

pub type NodeId<'src> = Id<AstNode<'src>>;

/// Expression tree produced by the parser. Identifier names borrow from the
/// source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode<'src> {
  Num {
    value: i64,
  },
  Var {
    name: &'src str,
  },
  Binary {
    op: BinaryOp,
    lhs: NodeId<'src>,
    rhs: NodeId<'src>,
  },
}

/// `target = value`, the only statement form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assign<'src> {
  pub target: &'src str,
  pub value: NodeId<'src>,
  /// Byte offset of the target identifier.
  pub loc: usize,
}

/// Statements in source order plus the arena that owns their expressions.
pub struct Program<'src> {
  nodes: Arena<AstNode<'src>>,
  stmts: Vec<Assign<'src>>,
}

impl<'src> Program<'src> {
  fn new() -> Self {
    Self {
      nodes: Arena::new(),
      stmts: Vec::new(),
    }
  }

  fn alloc(&mut self, node: AstNode<'src>) -> NodeId<'src> {
    self.nodes.alloc(node)
  }

  pub fn stmts(&self) -> &[Assign<'src>] {
    &self.stmts
  }

  pub fn node(&self, id: NodeId<'src>) -> &AstNode<'src> {
    &self.nodes[id]
  }
}

/// Parse a sequence of assignment statements. Never fails; see the module
/// docs for how malformed statements are dropped.
pub fn parse(source: &str) -> Program<'_> {
  let mut stream = TokenStream::new(source);
  let mut program = Program::new();

  while !stream.is_eof() {
    let checkpoint = stream.clone();
    match parse_stmt(&mut stream, &mut program) {
      Ok(stmt) => program.stmts.push(stmt),
      Err(err) => {
        debug!(offset = checkpoint.peek().loc, "skipping malformed statement\n{err}");
        stream = checkpoint;
        stream.advance();
      }
    }
  }

  program
}

fn parse_stmt<'src>(
  stream: &mut TokenStream<'src>,
  program: &mut Program<'src>,
) -> CompileResult<Assign<'src>> {
  let (target, loc) = stream.get_ident()?;
  stream.skip("=")?;
  let value = parse_add(stream, program)?;
  // The terminator is optional.
  stream.equal(";");
  Ok(Assign { target, value, loc })
}

fn parse_add<'src>(
  stream: &mut TokenStream<'src>,
  program: &mut Program<'src>,
) -> CompileResult<NodeId<'src>> {
  let mut node = parse_mul(stream, program)?;

  loop {
    let op_str = match stream.peek_operator() {
      Some(symbol @ "+") => symbol,
      Some(symbol @ "-") => symbol,
      _ => break,
    };

    let op = match op_str {
      "+" => BinaryOp::Add,
      "-" => BinaryOp::Sub,
      _ => unreachable!(),
    };

    stream.skip(op_str)?;
    let rhs = parse_mul(stream, program)?;
    node = program.alloc(AstNode::Binary { op, lhs: node, rhs });
  }

  Ok(node)
}

fn parse_mul<'src>(
  stream: &mut TokenStream<'src>,
  program: &mut Program<'src>,
) -> CompileResult<NodeId<'src>> {
  let mut node = parse_primary(stream, program)?;

  loop {
    let op_str = match stream.peek_operator() {
      Some(symbol @ "*") => symbol,
      Some(symbol @ "/") => symbol,
      _ => break,
    };

    let op = match op_str {
      "*" => BinaryOp::Mul,
      "/" => BinaryOp::Div,
      _ => unreachable!(),
    };

    stream.skip(op_str)?;
    let rhs = parse_primary(stream, program)?;
    node = program.alloc(AstNode::Binary { op, lhs: node, rhs });
  }

  Ok(node)
}

fn parse_primary<'src>(
  stream: &mut TokenStream<'src>,
  program: &mut Program<'src>,
) -> CompileResult<NodeId<'src>> {
  match stream.peek().kind {
    TokenKind::Ident => {
      let (name, _) = stream.get_ident()?;
      Ok(program.alloc(AstNode::Var { name }))
    }
    TokenKind::Num => {
      let (value, _) = stream.get_number()?;
      Ok(program.alloc(AstNode::Num { value }))
    }
    _ => {
      let token = stream.peek();
      let got = describe_token(token, stream.source);
      let message = if got == "(" {
        "parenthesized expressions are not supported".to_string()
      } else {
        format!("expected a number or identifier, but got \"{got}\"")
      };
      Err(CompileError::at(stream.source, token.loc, message))
    }
  }
}

/// Lazy cursor over the lexer holding one token of lookahead. Cloning it
/// is cheap and is how the parser backtracks to a statement boundary.
#[derive(Debug, Clone)]
struct TokenStream<'a> {
  lexer: Lexer<'a>,
  current: Token,
  source: &'a str,
}

impl<'a> TokenStream<'a> {
  fn new(source: &'a str) -> Self {
    let mut lexer = Lexer::new(source);
    let current = lexer.next_token();
    Self {
      lexer,
      current,
      source,
    }
  }

  fn peek(&self) -> &Token {
    &self.current
  }

  /// Consume the current token and pull the next one from the lexer.
  fn advance(&mut self) -> Token {
    let token = self.current;
    self.current = self.lexer.next_token();
    token
  }

  /// The text of the current token if it is an arithmetic operator.
  fn peek_operator(&self) -> Option<&'a str> {
    Some(self.peek())
      .filter(|token| token.kind == TokenKind::Operator)
      .map(|token| token_text(token, self.source))
  }

  /// Consume the current token if it matches the provided operator or
  /// punctuator.
  fn equal(&mut self, op: &str) -> bool {
    let token = self.peek();
    if matches!(
      token.kind,
      TokenKind::Operator | TokenKind::Assign | TokenKind::Punctuator
    ) && token.len == op.len()
      && token_text(token, self.source) == op
    {
      self.advance();
      return true;
    }
    false
  }

  fn skip(&mut self, s: &str) -> CompileResult<()> {
    if self.equal(s) {
      Ok(())
    } else {
      let token = self.peek();
      let got = describe_token(token, self.source);
      Err(CompileError::at(
        self.source,
        token.loc,
        format!("expected \"{s}\", but got \"{got}\""),
      ))
    }
  }

  /// Parse the current token as an integer literal returning its value and location.
  fn get_number(&mut self) -> CompileResult<(i64, usize)> {
    let token = *self.peek();
    if token.kind == TokenKind::Num {
      let value = token.value.ok_or_else(|| {
        CompileError::at(
          self.source,
          token.loc,
          "internal error: numeric token missing value",
        )
      })?;
      self.advance();
      return Ok((value, token.loc));
    }

    let got = describe_token(&token, self.source);
    Err(CompileError::at(
      self.source,
      token.loc,
      format!("expected a number, but got \"{got}\""),
    ))
  }

  /// Parse the current token as an identifier.
  fn get_ident(&mut self) -> CompileResult<(&'a str, usize)> {
    let token = *self.peek();
    if token.kind == TokenKind::Ident {
      self.advance();
      return Ok((token_text(&token, self.source), token.loc));
    }

    let got = describe_token(&token, self.source);
    Err(CompileError::at(
      self.source,
      token.loc,
      format!("expected an identifier, but got \"{got}\""),
    ))
  }

  fn is_eof(&self) -> bool {
    self.peek().kind == TokenKind::Eof
  }
}
