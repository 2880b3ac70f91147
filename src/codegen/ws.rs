//! Lowering from the stack language to ARM64.
//!
//! Memory model: the operand stack is the architectural stack, one value per
//! 16-byte `Psh`/`Pop` slot; heap cells are 64-bit with an 8-byte stride on
//! `array` (address scaled by `lsl #3` off x29); `Call`/`Return` go through
//! the software return stack in x28 so the language's call stack never
//! touches the link register. Each source instruction is preceded by a
//! comment anchor so disassembly stays auditable.
//!
//! The input is a loaded `Program`, so every referenced label exists and is
//! unique; the emitter has no failure mode. Runtime invariants (stack depth,
//! division by zero) are not checked here; programs the interpreter rejects
//! are undefined at the machine level.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use super::asm::{Arm64, CondCode, Reg};
use super::{mov_imm64, HEAP_BASE, RETSTACK};
use crate::inst::{ArithOp, Cond, Instr};
use crate::program::Program;

const X0: Reg = Reg::X(0);
const X1: Reg = Reg::X(1);
const X2: Reg = Reg::X(2);
/// Holds the heap address across runtime-routine calls; the routines only
/// clobber x0-x8 and x16.
const ADDR: Reg = Reg::X(19);

/// Source labels render with this prefix, keeping them out of the emitter's
/// internal namespaces (`ret_*`, `while_*`, the runtime routines).
fn sym(label: &str) -> String {
    format!("w_{label}")
}

/// The low 64 bits of a push literal, two's complement. Values that do not
/// fit are outside the equivalence envelope but still lower deterministically.
fn wrap64(n: &BigInt) -> i64 {
    n.to_i64().unwrap_or_else(|| {
        let masked = n & BigInt::from(u64::MAX);
        masked.to_u64().unwrap_or_default() as i64
    })
}

pub fn compile(program: &Program) -> Vec<Arm64> {
    let mut out = super::prologue();
    let mut ret_sites = 0usize;
    for instr in program.instrs() {
        out.push(Arm64::Comment(format!("{instr:?}")));
        lower(instr, &mut ret_sites, &mut out);
    }
    out.extend(super::epilogue());
    out
}

fn lower(instr: &Instr, ret_sites: &mut usize, out: &mut Vec<Arm64>) {
    use Arm64::*;
    match instr {
        Instr::Push(n) => {
            mov_imm64(out, X0, wrap64(n));
            out.push(Psh(X0));
        }
        Instr::Dup => {
            out.push(Ldr(X0, Reg::Sp, 0));
            out.push(Psh(X0));
        }
        Instr::Swap => {
            out.push(Pop(X0));
            out.push(Pop(X1));
            out.push(Psh(X0));
            out.push(Psh(X1));
        }
        Instr::Discard => out.push(Pop(X0)),
        Instr::Copy(k) => {
            out.push(Ldr(X0, Reg::Sp, 16 * *k as i32));
            out.push(Psh(X0));
        }
        Instr::Slide(k) => {
            out.push(Pop(X0));
            out.push(AddImm(Reg::Sp, Reg::Sp, 16 * *k as i64));
            out.push(Psh(X0));
        }
        Instr::Arith(op) => {
            out.push(Pop(X1));
            out.push(Pop(X0));
            match op {
                ArithOp::Add => out.push(Add(X0, X0, X1)),
                ArithOp::Sub => out.push(Sub(X0, X0, X1)),
                ArithOp::Mul => out.push(Mul(X0, X0, X1)),
                ArithOp::Div => out.push(Sdiv(X0, X0, X1)),
                ArithOp::Mod => {
                    out.push(Sdiv(X2, X0, X1));
                    out.push(Msub(X0, X2, X1, X0));
                }
            }
            out.push(Psh(X0));
        }
        Instr::Label(l) => out.push(Label(sym(l))),
        Instr::Call(l) => {
            *ret_sites += 1;
            let anchor = format!("ret_{ret_sites}");
            out.push(Adr(X0, anchor.clone()));
            out.push(StrPost(X0, RETSTACK, 8));
            out.push(B(sym(l)));
            out.push(Label(anchor));
        }
        Instr::Jump(l) => out.push(B(sym(l))),
        Instr::Branch(cond, l) => {
            out.push(Pop(X0));
            out.push(CmpImm(X0, 0));
            let cc = match cond {
                Cond::Zero => CondCode::Eq,
                Cond::Neg => CondCode::Lt,
            };
            out.push(Bc(cc, sym(l)));
        }
        Instr::Return => {
            out.push(LdrPre(X0, RETSTACK, -8));
            out.push(Br(X0));
        }
        Instr::End => out.push(B("terminate".into())),
        Instr::Store => {
            out.push(Pop(X1));
            out.push(Pop(X0));
            out.push(LslImm(X0, X0, 3));
            out.push(StrReg(X1, HEAP_BASE, X0));
        }
        Instr::Retrieve => {
            out.push(Pop(X0));
            out.push(LslImm(X0, X0, 3));
            out.push(LdrReg(X0, HEAP_BASE, X0));
            out.push(Psh(X0));
        }
        Instr::OutputChar => {
            out.push(Pop(X0));
            out.push(Bl("_output_char".into()));
        }
        Instr::OutputNum => {
            out.push(Pop(X0));
            out.push(Bl("_output_num".into()));
        }
        Instr::InputChar => {
            out.push(Pop(ADDR));
            out.push(Bl("_input_char".into()));
            out.push(LslImm(ADDR, ADDR, 3));
            out.push(StrReg(X0, HEAP_BASE, ADDR));
        }
        Instr::InputNum => {
            out.push(Pop(ADDR));
            out.push(Bl("_input_num".into()));
            out.push(LslImm(ADDR, ADDR, 3));
            out.push(StrReg(X0, HEAP_BASE, ADDR));
        }
    }
}
