//! Differential testing support: a random program generator whose samples
//! the interpreter accepts by construction, a greedy shrinker, and the
//! harness that runs one sample through both engines and compares bytes.
//!
//! The harness writes `prog.s` into its working directory, hands control to
//! the external assemble-and-run script (contract: read `prog.s`, write
//! `out.txt`; exit code ignored), then compares `out.txt` against the
//! scripted interpreter run. Working directories must not be shared between
//! concurrently running harnesses.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use num_bigint::BigInt;
use rand::rngs::StdRng;
use rand::Rng;

use crate::codegen::{asm, compile_ws};
use crate::inst::{ArithOp, Instr};
use crate::interpreter::{self, RuntimeError};
use crate::io::ScriptedIo;
use crate::program::Program;

/// Generate a straight-line, input-free program of roughly `target_len`
/// instructions, ending in `End`, from a heap-and-output-heavy distribution.
///
/// Every sample is acceptable to the interpreter and stays inside the
/// 64-bit equivalence envelope, by static tracking:
/// - stack height, so every pop has something to pop;
/// - an absolute-value bound per stack slot, so no intermediate can exceed
///   i64 (multiplications that might are downgraded to additions);
/// - heap addresses come only from fresh literals in 0..10, so the compiled
///   program never leaves its cell region;
/// - divisors are fresh nonzero literals, so division cannot trap.
pub fn gen_instrs(rng: &mut StdRng, target_len: usize) -> Vec<Instr> {
    const LIMIT: u128 = i64::MAX as u128;
    let mut instrs: Vec<Instr> = Vec::with_capacity(target_len + 2);
    // Parallel to the runtime operand stack: an upper bound on each |value|.
    let mut bounds: Vec<u128> = Vec::new();
    let mut heap_bound: u128 = 0;

    while instrs.len() < target_len {
        let h = bounds.len();
        let roll = rng.gen_range(0..100);
        match roll {
            // Store the current top at a small literal address.
            18..=32 if h >= 1 => {
                instrs.push(Instr::Push(BigInt::from(rng.gen_range(0..10i64))));
                instrs.push(Instr::Swap);
                instrs.push(Instr::Store);
                let v = bounds.pop().unwrap_or(0);
                heap_bound = heap_bound.max(v);
            }
            // Retrieve from a small literal address.
            33..=42 => {
                instrs.push(Instr::Push(BigInt::from(rng.gen_range(0..10i64))));
                instrs.push(Instr::Retrieve);
                bounds.push(heap_bound);
            }
            43..=54 if h >= 1 => {
                instrs.push(Instr::OutputNum);
                bounds.pop();
            }
            55..=62 if h >= 1 => {
                instrs.push(Instr::OutputChar);
                bounds.pop();
            }
            63..=72 if h >= 2 => {
                let b = bounds.pop().unwrap_or(0);
                let a = bounds.pop().unwrap_or(0);
                let sum = a.saturating_add(b);
                let prod = a.saturating_mul(b);
                if sum > LIMIT {
                    // Operands already too wide to combine; feed the pool.
                    bounds.push(a);
                    bounds.push(b);
                    let n = rng.gen_range(-9..=9i64);
                    instrs.push(Instr::Push(BigInt::from(n)));
                    bounds.push(n.unsigned_abs() as u128);
                } else {
                    let op = match rng.gen_range(0..3) {
                        0 => ArithOp::Add,
                        1 => ArithOp::Sub,
                        _ if prod <= LIMIT => ArithOp::Mul,
                        _ => ArithOp::Add,
                    };
                    instrs.push(Instr::Arith(op));
                    bounds.push(if op == ArithOp::Mul { prod } else { sum });
                }
            }
            // Division by a fresh nonzero literal divisor.
            73..=78 if h >= 1 => {
                let divisor = rng.gen_range(1..=9i64);
                instrs.push(Instr::Push(BigInt::from(divisor)));
                let op = if rng.gen_bool(0.5) { ArithOp::Div } else { ArithOp::Mod };
                instrs.push(Instr::Arith(op));
                let a = bounds.pop().unwrap_or(0);
                bounds.push(match op {
                    // Truncated: |a/d| <= |a|, |a mod d| <= d-1.
                    ArithOp::Div => a,
                    _ => (divisor - 1) as u128,
                });
            }
            79..=84 if h >= 1 => {
                instrs.push(Instr::Dup);
                let top = bounds.last().copied().unwrap_or(0);
                bounds.push(top);
            }
            85..=89 if h >= 2 => {
                instrs.push(Instr::Swap);
                bounds.swap(h - 1, h - 2);
            }
            90..=93 if h >= 1 => {
                instrs.push(Instr::Discard);
                bounds.pop();
            }
            94..=96 if h >= 1 => {
                let k = rng.gen_range(0..h.min(4));
                instrs.push(Instr::Copy(k));
                bounds.push(bounds[h - 1 - k]);
            }
            97..=99 if h >= 2 => {
                let k = rng.gen_range(1..h.min(4));
                instrs.push(Instr::Slide(k));
                let top = bounds.pop().unwrap_or(0);
                bounds.truncate(bounds.len() - k);
                bounds.push(top);
            }
            // Pushes feed everything else, and are the fallback whenever the
            // roll picked an op the current height cannot support.
            _ => {
                let n = rng.gen_range(-9..=9i64);
                instrs.push(Instr::Push(BigInt::from(n)));
                bounds.push(n.unsigned_abs() as u128);
            }
        }
    }
    instrs.push(Instr::End);
    instrs
}

/// One round of candidate reductions, most aggressive first: drop a single
/// instruction (never the trailing `End`), or zero a push literal.
pub fn shrink_once(instrs: &[Instr]) -> Vec<Vec<Instr>> {
    use num_traits::Zero;
    let mut candidates = Vec::new();
    for i in 0..instrs.len() {
        if matches!(instrs[i], Instr::End) {
            continue;
        }
        let mut fewer = instrs.to_vec();
        fewer.remove(i);
        candidates.push(fewer);
    }
    for (i, instr) in instrs.iter().enumerate() {
        if let Instr::Push(n) = instr {
            if !n.is_zero() {
                let mut smaller = instrs.to_vec();
                smaller[i] = Instr::Push(BigInt::zero());
                candidates.push(smaller);
            }
        }
    }
    candidates
}

/// Greedy shrink: keep taking the first candidate that still fails until no
/// candidate does.
pub fn shrink<F>(mut instrs: Vec<Instr>, mut still_fails: F) -> Vec<Instr>
where
    F: FnMut(&[Instr]) -> bool,
{
    loop {
        let reduced = shrink_once(&instrs).into_iter().find(|c| still_fails(c));
        match reduced {
            Some(next) => instrs = next,
            None => return instrs,
        }
    }
}

/// Interpreter output is one char per written byte; flatten it back to the
/// bytes the compiled program writes.
pub fn output_bytes(s: &str) -> Vec<u8> {
    s.chars().map(|c| (c as u32 & 0xff) as u8).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Match,
    /// The interpreter rejected the sample; nothing to compare.
    Discard(RuntimeError),
    Mismatch { interpreted: Vec<u8>, executed: Vec<u8> },
}

/// Paths the harness works against: a scratch directory for `prog.s` and
/// `out.txt`, and the assemble-and-run script.
pub struct Harness {
    pub workdir: PathBuf,
    pub script: PathBuf,
}

impl Harness {
    /// Interpret on empty input, compile, assemble-and-run, compare bytes.
    pub fn run_case(&self, program: &Program) -> std::io::Result<Outcome> {
        let mut io = ScriptedIo::new("");
        if let Err(e) = interpreter::exec(program, &mut io) {
            return Ok(Outcome::Discard(e));
        }
        let interpreted = output_bytes(io.output());

        std::fs::create_dir_all(&self.workdir)?;
        let out_path = self.workdir.join("out.txt");
        // A stale out.txt from an earlier sample must never be compared.
        let _ = std::fs::remove_file(&out_path);
        std::fs::write(self.workdir.join("prog.s"), asm::render(&compile_ws(program)))?;

        let script = self.script.canonicalize()?;
        let _ignored_exit = Command::new("sh")
            .arg(&script)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        let executed = std::fs::read(&out_path)?;
        Ok(if executed == interpreted {
            Outcome::Match
        } else {
            Outcome::Mismatch { interpreted, executed }
        })
    }
}
