use std::collections::HashMap;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::inst::{ArithOp, Cond, Instr};
use crate::io::Io;
use crate::program::Program;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("pop on empty operand stack")]
    ValStackEmpty,
    #[error("return with empty call stack")]
    CallStackEmpty,
    #[error("jump to undefined label: {0:?}")]
    NoSuchLabel(String),
    #[error("program counter {0} past end of program")]
    OutOfBounds(usize),
    #[error("division by zero")]
    DivByZero,
    #[error("input exhausted")]
    InputExhausted,
    #[error("malformed number on input: {0:?}")]
    MalformedNumber(String),
}

impl RuntimeError {
    /// Stable diagnostic code, one per failure kind.
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::ValStackEmpty => "WS-R001",
            RuntimeError::CallStackEmpty => "WS-R002",
            RuntimeError::NoSuchLabel(_) => "WS-R003",
            RuntimeError::OutOfBounds(_) => "WS-R004",
            RuntimeError::DivByZero => "WS-R005",
            RuntimeError::InputExhausted => "WS-R006",
            RuntimeError::MalformedNumber(_) => "WS-R007",
        }
    }
}

type Result<T> = std::result::Result<T, RuntimeError>;

/// What a single step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Halt,
}

/// VM state for one execution: operand stack, sparse heap, call stack,
/// program counter. Created fresh per run; the program itself is immutable.
pub struct Vm<'p> {
    program: &'p Program,
    stack: Vec<BigInt>,
    heap: HashMap<BigInt, BigInt>,
    calls: Vec<usize>,
    pc: usize,
}

impl<'p> Vm<'p> {
    pub fn new(program: &'p Program) -> Self {
        Vm { program, stack: Vec::new(), heap: HashMap::new(), calls: Vec::new(), pc: 0 }
    }

    fn pop(&mut self) -> Result<BigInt> {
        self.stack.pop().ok_or(RuntimeError::ValStackEmpty)
    }

    fn jump(&mut self, label: &str) -> Result<()> {
        self.pc = self
            .program
            .lookup(label)
            .ok_or_else(|| RuntimeError::NoSuchLabel(label.to_string()))?;
        Ok(())
    }

    /// Execute the instruction at the current pc. The pc advances by one
    /// unless the instruction redirects it.
    pub fn step(&mut self, io: &mut dyn Io) -> Result<Step> {
        let instr = self.program.at(self.pc).ok_or(RuntimeError::OutOfBounds(self.pc))?.clone();
        self.pc += 1;

        match instr {
            Instr::Push(n) => self.stack.push(n),
            Instr::Dup => {
                let top = self.stack.last().ok_or(RuntimeError::ValStackEmpty)?.clone();
                self.stack.push(top);
            }
            Instr::Swap => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(b);
                self.stack.push(a);
            }
            Instr::Discard => {
                self.pop()?;
            }
            Instr::Copy(k) => {
                let depth = self.stack.len();
                if depth < k + 1 {
                    return Err(RuntimeError::ValStackEmpty);
                }
                let v = self.stack[depth - 1 - k].clone();
                self.stack.push(v);
            }
            Instr::Slide(k) => {
                let top = self.pop()?;
                if self.stack.len() < k {
                    return Err(RuntimeError::ValStackEmpty);
                }
                self.stack.truncate(self.stack.len() - k);
                self.stack.push(top);
            }
            Instr::Arith(op) => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(arith(op, a, b)?);
            }
            Instr::Label(_) => {}
            Instr::Call(l) => {
                self.calls.push(self.pc);
                self.jump(&l)?;
            }
            Instr::Jump(l) => self.jump(&l)?,
            Instr::Branch(cond, l) => {
                let v = self.pop()?;
                let taken = match cond {
                    Cond::Zero => v.is_zero(),
                    Cond::Neg => v.is_negative(),
                };
                if taken {
                    self.jump(&l)?;
                }
            }
            Instr::Return => {
                self.pc = self.calls.pop().ok_or(RuntimeError::CallStackEmpty)?;
            }
            Instr::End => return Ok(Step::Halt),
            Instr::Store => {
                let value = self.pop()?;
                let addr = self.pop()?;
                self.heap.insert(addr, value);
            }
            Instr::Retrieve => {
                let addr = self.pop()?;
                let v = self.heap.get(&addr).cloned().unwrap_or_else(BigInt::zero);
                self.stack.push(v);
            }
            Instr::OutputChar => {
                let v = self.pop()?;
                io.write_string(&(byte_of(&v) as char).to_string());
            }
            Instr::OutputNum => {
                let v = self.pop()?;
                io.write_string(&v.to_string());
            }
            Instr::InputChar => {
                let addr = self.pop()?;
                let c = io.read_char().map_err(|_| RuntimeError::InputExhausted)?;
                self.heap.insert(addr, BigInt::from(c as u32));
            }
            Instr::InputNum => {
                let addr = self.pop()?;
                let n = read_number(io)?;
                self.heap.insert(addr, n);
            }
        }
        Ok(Step::Continue)
    }

    /// Step until `End` or the first error.
    pub fn run(&mut self, io: &mut dyn Io) -> Result<()> {
        while self.step(io)? == Step::Continue {}
        Ok(())
    }
}

/// Execute a program against an I/O capability from a fresh VM state.
pub fn exec(program: &Program, io: &mut dyn Io) -> Result<()> {
    Vm::new(program).run(io)
}

fn arith(op: ArithOp, a: BigInt, b: BigInt) -> Result<BigInt> {
    match op {
        ArithOp::Add => Ok(a + b),
        ArithOp::Sub => Ok(a - b),
        ArithOp::Mul => Ok(a * b),
        // Truncated toward zero, matching sdiv/msub in the compiled program.
        ArithOp::Div => {
            if b.is_zero() {
                return Err(RuntimeError::DivByZero);
            }
            Ok(a / b)
        }
        ArithOp::Mod => {
            if b.is_zero() {
                return Err(RuntimeError::DivByZero);
            }
            Ok(a % b)
        }
    }
}

/// Low byte of the value, Euclidean: -1 writes 0xff.
fn byte_of(v: &BigInt) -> u8 {
    let modulus = BigInt::from(256);
    let m = ((v % &modulus) + &modulus) % &modulus;
    m.to_u8().unwrap_or(0)
}

/// Read characters up to and including a linefeed. End-of-input before any
/// character is `InputExhausted`; end-of-input mid-line parses what arrived.
fn read_number(io: &mut dyn Io) -> Result<BigInt> {
    let mut line = String::new();
    loop {
        match io.read_char() {
            Ok('\n') => break,
            Ok(c) => line.push(c),
            Err(_) if line.is_empty() => return Err(RuntimeError::InputExhausted),
            Err(_) => break,
        }
    }
    let text = line.trim();
    text.parse::<BigInt>().map_err(|_| RuntimeError::MalformedNumber(line.clone()))
}
