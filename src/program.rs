use std::collections::HashMap;

use crate::inst::Instr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("duplicate label: {0:?}")]
    DuplicateLabel(String),
    #[error("jump to undefined label: {0:?}")]
    NoSuchLabel(String),
    #[error("label {0:?} contains characters outside [A-Za-z0-9_]")]
    BadLabel(String),
}

impl LoadError {
    /// Stable diagnostic code, one per failure kind.
    pub fn code(&self) -> &'static str {
        match self {
            LoadError::DuplicateLabel(_) => "WS-L001",
            LoadError::NoSuchLabel(_) => "WS-L002",
            LoadError::BadLabel(_) => "WS-L003",
        }
    }
}

/// A loaded program: the instruction array plus the label table built once
/// at load time. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Program {
    instrs: Vec<Instr>,
    labels: HashMap<String, usize>,
}

/// Label text must stay inside the assembler-symbol alphabet so the compiler
/// can render it verbatim (prefixed) without colliding with emitter-internal
/// names. Empty is allowed: the surface syntax permits an empty label token.
fn label_ok(label: &str) -> bool {
    label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Program {
    /// Scan the instruction list, recording each `Label` with its index.
    /// Duplicate labels, references to undefined labels, and label text
    /// outside the symbol alphabet are all load-time errors.
    pub fn new(instrs: Vec<Instr>) -> Result<Self, LoadError> {
        let mut labels = HashMap::new();
        for (idx, instr) in instrs.iter().enumerate() {
            if let Instr::Label(l) = instr {
                if !label_ok(l) {
                    return Err(LoadError::BadLabel(l.clone()));
                }
                if labels.insert(l.clone(), idx).is_some() {
                    return Err(LoadError::DuplicateLabel(l.clone()));
                }
            }
        }
        for instr in &instrs {
            if let Some(l) = instr.target() {
                if !labels.contains_key(l) {
                    return Err(LoadError::NoSuchLabel(l.to_string()));
                }
            }
        }
        Ok(Program { instrs, labels })
    }

    /// The instruction at `pc`, or `None` past the end of the array.
    pub fn at(&self, pc: usize) -> Option<&Instr> {
        self.instrs.get(pc)
    }

    /// Resolve a label to its instruction index.
    pub fn lookup(&self, label: &str) -> Option<usize> {
        self.labels.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inst::Cond;

    #[test]
    fn labels_resolve_to_their_indices() {
        let p = Program::new(vec![
            Instr::Label("a".into()),
            Instr::Push(1.into()),
            Instr::Label("b".into()),
            Instr::End,
        ])
        .unwrap();
        assert_eq!(p.lookup("a"), Some(0));
        assert_eq!(p.lookup("b"), Some(2));
        assert_eq!(p.lookup("c"), None);
        assert_eq!(p.at(1), Some(&Instr::Push(1.into())));
        assert_eq!(p.at(4), None);
    }

    #[test]
    fn duplicate_label_is_a_load_error() {
        let err = Program::new(vec![
            Instr::Label("a".into()),
            Instr::Label("a".into()),
            Instr::End,
        ])
        .unwrap_err();
        assert_eq!(err, LoadError::DuplicateLabel("a".into()));
    }

    #[test]
    fn reference_to_missing_label_is_a_load_error() {
        let err = Program::new(vec![Instr::Jump("nowhere".into()), Instr::End]).unwrap_err();
        assert_eq!(err, LoadError::NoSuchLabel("nowhere".into()));
        let err = Program::new(vec![
            Instr::Push(0.into()),
            Instr::Branch(Cond::Zero, "gone".into()),
            Instr::End,
        ])
        .unwrap_err();
        assert_eq!(err, LoadError::NoSuchLabel("gone".into()));
    }

    #[test]
    fn label_alphabet_is_enforced() {
        let err = Program::new(vec![Instr::Label("a.b".into()), Instr::End]).unwrap_err();
        assert_eq!(err, LoadError::BadLabel("a.b".into()));
    }

    #[test]
    fn empty_label_is_allowed() {
        let p = Program::new(vec![Instr::Label(String::new()), Instr::End]).unwrap();
        assert_eq!(p.lookup(""), Some(0));
    }
}
