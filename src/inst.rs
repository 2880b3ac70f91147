use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// Arithmetic opcodes. `Div` and `Mod` truncate toward zero, the same
/// convention `sdiv`/`msub` give the compiled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Conditions a `Branch` can test against the popped top of stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cond {
    /// Taken when the popped value is zero.
    Zero,
    /// Taken when the popped value is negative.
    Neg,
}

/// One instruction of the stack language.
///
/// Labels are symbol strings; the surface parser encodes its space/tab label
/// tokens injectively into `s`/`t` characters, and programs built in code use
/// ordinary identifiers. Resolution to instruction indices happens once, at
/// program load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instr {
    Push(BigInt),
    Dup,
    Swap,
    Discard,
    /// Push a copy of the element at depth `k` from the top.
    Copy(usize),
    /// Pop the top, drop the next `k` elements, push the top back.
    Slide(usize),
    Arith(ArithOp),
    Label(String),
    Call(String),
    Jump(String),
    Branch(Cond, String),
    Return,
    End,
    /// Pop value, pop address, heap[address] := value.
    Store,
    /// Pop address, push heap[address] (unset cells read as zero).
    Retrieve,
    OutputChar,
    OutputNum,
    /// Pop address, read one character, store its code point at the address.
    InputChar,
    /// Pop address, read a line, store the parsed number at the address.
    InputNum,
}

impl Instr {
    /// The label this instruction jumps to, if any. `Label` itself defines
    /// rather than references, so it is not included.
    pub fn target(&self) -> Option<&str> {
        match self {
            Instr::Call(l) | Instr::Jump(l) | Instr::Branch(_, l) => Some(l),
            _ => None,
        }
    }
}

/// One instruction of the byte-tape language. No labels in the source;
/// `While` nests structurally and the compiler mints loop labels from the
/// nesting path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TapeInstr {
    IncrPtr,
    DecrPtr,
    IncrByte,
    DecrByte,
    Output,
    Input,
    While(Vec<TapeInstr>),
}
