//! A tiny interpreter for the x86-64 subset the emitter produces, so tests can
//! check what a compiled program computes without assembling it.

#![allow(dead_code)]

use std::collections::HashMap;

use rclearc::codegen::declare_variables;
use rclearc::parser::parse;
use rclearc::symbols::SymbolTable;
use rclearc::{CompileOptions, compile_with};

#[derive(Debug, PartialEq, Eq)]
pub enum Fault {
  DivideError,
  StackUnderflow,
  Unsupported(String),
  NoExit,
}

/// Final machine state after the exit syscall.
#[derive(Debug)]
pub struct Outcome {
  pub exit_code: i64,
  cells: HashMap<String, i64>,
  labels: HashMap<String, String>,
}

impl Outcome {
  /// Final value of a source variable.
  pub fn var(&self, name: &str) -> i64 {
    let label = self
      .labels
      .get(name)
      .unwrap_or_else(|| panic!("no storage for `{name}`"));
    self.cells[label]
  }
}

pub fn assemble_and_run(source: &str, options: CompileOptions) -> Result<Outcome, Fault> {
  let mut out = Vec::new();
  compile_with(source, &options, &mut out).expect("in-memory compile");
  let asm = String::from_utf8(out).expect("ascii assembly");

  let program = parse(source);
  let mut symbols = SymbolTable::new();
  declare_variables(&program, &mut symbols);
  let labels = symbols
    .iter()
    .map(|symbol| (symbol.name.clone(), symbol.label.clone()))
    .collect();

  let (exit_code, cells) = execute(&asm)?;
  Ok(Outcome {
    exit_code,
    cells,
    labels,
  })
}

pub fn run(source: &str) -> Outcome {
  assemble_and_run(source, CompileOptions::default()).expect("program runs to exit")
}

#[derive(Default)]
struct Machine {
  regs: HashMap<String, i64>,
  cells: HashMap<String, i64>,
  stack: Vec<i64>,
}

enum Operand {
  Imm(i64),
  Reg(String),
  Mem(String),
}

impl Machine {
  fn read(&self, operand: &Operand) -> i64 {
    match operand {
      Operand::Imm(value) => *value,
      Operand::Reg(reg) => self.regs.get(reg).copied().unwrap_or(0),
      Operand::Mem(label) => self.cells[label],
    }
  }

  fn write(&mut self, operand: &Operand, value: i64) -> Result<(), Fault> {
    match operand {
      Operand::Imm(_) => return Err(Fault::Unsupported("store to immediate".into())),
      Operand::Reg(reg) => {
        self.regs.insert(reg.clone(), value);
      }
      Operand::Mem(label) => {
        let cell = self
          .cells
          .get_mut(label)
          .ok_or_else(|| Fault::Unsupported(format!("undeclared label {label}")))?;
        *cell = value;
      }
    }
    Ok(())
  }

  fn reg(&self, name: &str) -> i64 {
    self.regs.get(name).copied().unwrap_or(0)
  }
}

fn operand(text: &str) -> Result<Operand, Fault> {
  let text = text.trim();
  if let Some(imm) = text.strip_prefix('$') {
    return imm
      .parse()
      .map(Operand::Imm)
      .map_err(|_| Fault::Unsupported(format!("immediate {text}")));
  }
  if let Some(reg) = text.strip_prefix('%') {
    return Ok(Operand::Reg(reg.to_string()));
  }
  if let Some(label) = text.strip_suffix("(%rip)") {
    return Ok(Operand::Mem(label.to_string()));
  }
  Err(Fault::Unsupported(format!("operand {text}")))
}

fn execute(asm: &str) -> Result<(i64, HashMap<String, i64>), Fault> {
  let mut machine = Machine::default();
  let mut in_text = false;

  for line in asm.lines() {
    let line = line.trim();
    match line {
      "" | ".data" | ".global _start" | "_start:" | ".quad 0" => continue,
      ".text" => {
        in_text = true;
        continue;
      }
      _ => {}
    }

    if !in_text {
      let label = line
        .strip_suffix(':')
        .ok_or_else(|| Fault::Unsupported(line.to_string()))?;
      machine.cells.insert(label.to_string(), 0);
      continue;
    }

    let (mnemonic, rest) = line.split_once(' ').unwrap_or((line, ""));
    let ops = rest
      .split(", ")
      .filter(|s| !s.is_empty())
      .map(operand)
      .collect::<Result<Vec<_>, _>>()?;

    match (mnemonic, ops.as_slice()) {
      ("mov", [src, dst]) => {
        let value = machine.read(src);
        machine.write(dst, value)?;
      }
      ("add" | "addq", [src, dst]) => {
        let value = machine.read(dst).wrapping_add(machine.read(src));
        machine.write(dst, value)?;
      }
      ("sub" | "subq", [src, dst]) => {
        let value = machine.read(dst).wrapping_sub(machine.read(src));
        machine.write(dst, value)?;
      }
      ("imul", [src, dst]) => {
        let value = machine.read(dst).wrapping_mul(machine.read(src));
        machine.write(dst, value)?;
      }
      ("xor", [src, dst]) => {
        let value = machine.read(dst) ^ machine.read(src);
        machine.write(dst, value)?;
      }
      ("push", [src]) => {
        let value = machine.read(src);
        machine.stack.push(value);
      }
      ("pop", [dst]) => {
        let value = machine.stack.pop().ok_or(Fault::StackUnderflow)?;
        machine.write(dst, value)?;
      }
      ("cqo", []) => {
        let sign = if machine.reg("rax") < 0 { -1 } else { 0 };
        machine.regs.insert("rdx".into(), sign);
      }
      ("idiv", [divisor]) => {
        let divisor = i128::from(machine.read(divisor));
        if divisor == 0 {
          return Err(Fault::DivideError);
        }
        let dividend =
          (i128::from(machine.reg("rdx")) << 64) | i128::from(machine.reg("rax") as u64);
        let quotient = i64::try_from(dividend / divisor).map_err(|_| Fault::DivideError)?;
        let remainder = (dividend % divisor) as i64;
        machine.regs.insert("rax".into(), quotient);
        machine.regs.insert("rdx".into(), remainder);
      }
      ("syscall", []) => {
        if machine.reg("rax") == 60 {
          return Ok((machine.reg("rdi"), machine.cells));
        }
        return Err(Fault::Unsupported(format!("syscall {}", machine.reg("rax"))));
      }
      _ => return Err(Fault::Unsupported(line.to_string())),
    }
  }

  Err(Fault::NoExit)
}
