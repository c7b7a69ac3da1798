//! Code generation: lower the parsed program into AT&T x86-64 assembly.
//!
//! Generation runs in two passes. The first registers every variable in the
//! symbol table so that each one owns a zero-initialised `.quad` cell before
//! any instruction refers to it. The second writes the `.data` section, one
//! instruction block per statement, and the `exit(0)` syscall.
//!
//! Expressions are evaluated into `%rax`. A binary node evaluates its left
//! operand, parks it on the machine stack, evaluates the right operand and
//! pops the left one into `%rdi`, so arbitrarily deep trees need no register
//! allocation. Before a statement takes that path, the rewrite matchers in
//! [`MATCHERS`] get a chance to claim it.

use std::io::Write;

use snafu::{OptionExt, ResultExt};
use tracing::debug;

use crate::config::CompileOptions;
use crate::error::{CompileResult, MissingStorageSnafu, WriteOutputSnafu};
use crate::parser::{Assign, AstNode, BinaryOp, NodeId, Program};
use crate::symbols::SymbolTable;

/// Register every variable of the program. Assignment targets come first in
/// statement order, followed by names that are only ever read.
pub fn declare_variables(program: &Program, symbols: &mut SymbolTable) {
  for stmt in program.stmts() {
    symbols.get_or_create_label(stmt.target);
  }
  for stmt in program.stmts() {
    declare_reads(program, stmt.value, symbols);
  }
}

fn declare_reads<'src>(program: &Program<'src>, id: NodeId<'src>, symbols: &mut SymbolTable) {
  match program.node(id) {
    AstNode::Num { .. } => {}
    AstNode::Var { name } => {
      symbols.get_or_create_label(name);
    }
    AstNode::Binary { lhs, rhs, .. } => {
      declare_reads(program, *lhs, symbols);
      declare_reads(program, *rhs, symbols);
    }
  }
}

/// Emit assembly for a whole program into `out`.
pub fn generate<W: Write>(
  program: &Program,
  symbols: &mut SymbolTable,
  options: &CompileOptions,
  out: &mut W,
) -> CompileResult<()> {
  declare_variables(program, symbols);

  let mut emitter = Emitter {
    out,
    program,
    symbols: &*symbols,
    options: *options,
  };
  emitter.emit_program()
}

/// Statement-level replacement for general evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rewrite {
  /// `addq`/`subq` an immediate straight into the target's cell.
  InPlace { op: InPlaceOp, imm: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InPlaceOp {
  Add,
  Sub,
}

impl InPlaceOp {
  fn mnemonic(self) -> &'static str {
    match self {
      InPlaceOp::Add => "addq",
      InPlaceOp::Sub => "subq",
    }
  }
}

type Matcher = for<'src> fn(&Program<'src>, &Assign<'src>) -> Option<Rewrite>;

/// Tried in order; the first match wins.
const MATCHERS: &[Matcher] = &[match_in_place_update];

/// `x = x + k` or `x = x - k` where `k` is a literal that fits an imm32.
fn match_in_place_update<'src>(program: &Program<'src>, stmt: &Assign<'src>) -> Option<Rewrite> {
  let AstNode::Binary { op, lhs, rhs } = program.node(stmt.value) else {
    return None;
  };
  let op = match op {
    BinaryOp::Add => InPlaceOp::Add,
    BinaryOp::Sub => InPlaceOp::Sub,
    BinaryOp::Mul | BinaryOp::Div => return None,
  };
  let AstNode::Var { name } = program.node(*lhs) else {
    return None;
  };
  if name.as_bytes() != stmt.target.as_bytes() {
    return None;
  }
  let AstNode::Num { value } = program.node(*rhs) else {
    return None;
  };
  // Memory operands only take a sign-extended 32-bit immediate.
  let imm = i32::try_from(*value).ok()?;
  Some(Rewrite::InPlace { op, imm })
}

struct Emitter<'a, 'src, W> {
  out: &'a mut W,
  program: &'a Program<'src>,
  symbols: &'a SymbolTable,
  options: CompileOptions,
}

impl<'a, 'src, W: Write> Emitter<'a, 'src, W> {
  fn push(&mut self, text: &str) -> CompileResult<()> {
    self.out.write_all(text.as_bytes()).context(WriteOutputSnafu)
  }

  fn label(&self, name: &str) -> CompileResult<&'a str> {
    let symbols = self.symbols;
    symbols
      .label(name)
      .context(MissingStorageSnafu { name })
  }

  fn emit_program(&mut self) -> CompileResult<()> {
    self.push("    .data\n")?;
    let symbols = self.symbols;
    for symbol in symbols.iter() {
      self.push(&format!("{}:\n", symbol.label))?;
      self.push("    .quad 0\n")?;
    }

    self.push("    .text\n")?;
    self.push("    .global _start\n")?;
    self.push("_start:\n")?;

    let program = self.program;
    for stmt in program.stmts() {
      self.emit_stmt(stmt)?;
    }

    self.push("    mov $60, %rax\n")?;
    self.push("    xor %rdi, %rdi\n")?;
    self.push("    syscall\n")
  }

  fn emit_stmt(&mut self, stmt: &Assign<'src>) -> CompileResult<()> {
    if self.options.in_place_updates
      && let Some(rewrite) = MATCHERS
        .iter()
        .find_map(|matcher| matcher(self.program, stmt))
    {
      debug!(target_var = stmt.target, ?rewrite, "applying rewrite");
      return self.emit_rewrite(stmt, rewrite);
    }

    self.emit_expr(stmt.value)?;
    let label = self.label(stmt.target)?;
    self.push(&format!("    mov %rax, {label}(%rip)\n"))
  }

  fn emit_rewrite(&mut self, stmt: &Assign<'src>, rewrite: Rewrite) -> CompileResult<()> {
    match rewrite {
      Rewrite::InPlace { op, imm } => {
        let label = self.label(stmt.target)?;
        let mnemonic = op.mnemonic();
        self.push(&format!("    {mnemonic} ${imm}, {label}(%rip)\n"))
      }
    }
  }

  /// Emit code leaving the value of a single expression node in `%rax`.
  fn emit_expr(&mut self, id: NodeId<'src>) -> CompileResult<()> {
    let program = self.program;
    match program.node(id) {
      AstNode::Num { value } => self.push(&format!("    mov ${value}, %rax\n")),
      AstNode::Var { name } => {
        let label = self.label(name)?;
        self.push(&format!("    mov {label}(%rip), %rax\n"))
      }
      AstNode::Binary { op, lhs, rhs } => {
        self.emit_expr(*lhs)?;
        self.push("    push %rax\n")?;
        self.emit_expr(*rhs)?;
        // %rdi holds the left operand, %rax the right one.
        self.push("    pop %rdi\n")?;
        match op {
          BinaryOp::Add => self.push("    add %rdi, %rax\n"),
          BinaryOp::Mul => self.push("    imul %rdi, %rax\n"),
          BinaryOp::Sub => {
            self.push("    sub %rax, %rdi\n")?;
            self.push("    mov %rdi, %rax\n")
          }
          BinaryOp::Div => {
            self.push("    mov %rax, %rcx\n")?;
            self.push("    mov %rdi, %rax\n")?;
            self.push("    cqo\n")?;
            self.push("    idiv %rcx\n")
          }
        }
      }
    }
  }
}
