//! Variable name to storage label mapping for one compilation.
//!
//! Labels are handed out from a monotonically increasing counter and are
//! never reused. Insertion order is preserved because it decides the order of
//! the storage declarations in the emitted `.data` section.

use tracing::trace;

const LABEL_PREFIX: &str = "v_";

/// One registered variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
  pub name: String,
  pub label: String,
  pub index: usize,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
  entries: Vec<Symbol>,
  next_id: usize,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Return the label for `name`, registering the name on first sight.
  pub fn get_or_create_label(&mut self, name: &str) -> &str {
    let index = match self.position(name) {
      Some(index) => index,
      None => {
        let label = format!("{LABEL_PREFIX}{}", self.next_id);
        self.next_id += 1;
        let index = self.entries.len();
        trace!(variable = name, %label, "registered variable");
        self.entries.push(Symbol {
          name: name.to_string(),
          label,
          index,
        });
        index
      }
    };
    &self.entries[index].label
  }

  /// Look up an existing label without registering anything.
  pub fn label(&self, name: &str) -> Option<&str> {
    self
      .position(name)
      .map(|index| self.entries[index].label.as_str())
  }

  pub fn entry_at(&self, index: usize) -> Option<&Symbol> {
    self.entries.get(index)
  }

  /// Entries in first-insertion order.
  pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  fn position(&self, name: &str) -> Option<usize> {
    self
      .entries
      .iter()
      .position(|entry| entry.name.as_bytes() == name.as_bytes())
  }
}
