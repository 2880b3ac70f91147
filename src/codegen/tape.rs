//! Lowering from the byte-tape language to ARM64.
//!
//! The tape is the shared `array` region, one byte per cell, based at x29.
//! The data pointer is kept as a 64-bit index in the top stack slot (the
//! prologue's zero sentinel), so every cell access is `[x29, index]` and the
//! pointer can never be confused with a raw address.
//!
//! The source has no labels; loops are labeled by their lexical path: the
//! loop at body position `i` gets `while_i`/`whileend_i`, a loop at position
//! `j` inside it gets `while_i.j`, and so on. Paths are unique by
//! construction, which keeps nested loop labels from ever colliding.

use super::asm::{Arm64, CondCode, Reg};
use super::HEAP_BASE;
use crate::inst::TapeInstr;

const X0: Reg = Reg::X(0);
const X1: Reg = Reg::X(1);

pub fn compile(program: &[TapeInstr]) -> Vec<Arm64> {
    let mut out = super::prologue();
    lower_seq(program, "", &mut out);
    out.extend(super::epilogue());
    out
}

fn lower_seq(body: &[TapeInstr], path: &str, out: &mut Vec<Arm64>) {
    use Arm64::*;
    for (i, instr) in body.iter().enumerate() {
        match instr {
            TapeInstr::IncrPtr => {
                out.push(Comment("IncrPtr".into()));
                out.push(Pop(X0));
                out.push(AddImm(X0, X0, 1));
                out.push(Psh(X0));
            }
            TapeInstr::DecrPtr => {
                out.push(Comment("DecrPtr".into()));
                out.push(Pop(X0));
                out.push(SubImm(X0, X0, 1));
                out.push(Psh(X0));
            }
            TapeInstr::IncrByte => {
                out.push(Comment("IncrByte".into()));
                out.push(Ldr(X0, Reg::Sp, 0));
                out.push(LdrbReg(X1, HEAP_BASE, X0));
                out.push(AddImm(X1, X1, 1));
                out.push(StrbReg(X1, HEAP_BASE, X0));
            }
            TapeInstr::DecrByte => {
                out.push(Comment("DecrByte".into()));
                out.push(Ldr(X0, Reg::Sp, 0));
                out.push(LdrbReg(X1, HEAP_BASE, X0));
                out.push(SubImm(X1, X1, 1));
                out.push(StrbReg(X1, HEAP_BASE, X0));
            }
            TapeInstr::Output => {
                out.push(Comment("Output".into()));
                out.push(Ldr(X0, Reg::Sp, 0));
                out.push(LdrbReg(X0, HEAP_BASE, X0));
                out.push(Bl("_output_char".into()));
            }
            TapeInstr::Input => {
                out.push(Comment("Input".into()));
                out.push(Bl("_input_char".into()));
                out.push(Ldr(X1, Reg::Sp, 0));
                out.push(StrbReg(X0, HEAP_BASE, X1));
            }
            TapeInstr::While(inner) => {
                let idx =
                    if path.is_empty() { i.to_string() } else { format!("{path}.{i}") };
                out.push(Comment(format!("While {idx}")));
                out.push(Label(format!("while_{idx}")));
                out.push(Ldr(X0, Reg::Sp, 0));
                out.push(LdrbReg(X1, HEAP_BASE, X0));
                out.push(CmpImm(X1, 0));
                out.push(Bc(CondCode::Eq, format!("whileend_{idx}")));
                lower_seq(inner, &idx, out);
                out.push(B(format!("while_{idx}")));
                out.push(Label(format!("whileend_{idx}")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::asm::render;
    use crate::parser::parse_tape;

    fn labels_of(program: &[Arm64]) -> Vec<String> {
        program
            .iter()
            .filter_map(|i| match i {
                Arm64::Label(l) if l.starts_with("while") => Some(l.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn loop_shape_tests_the_cell_then_repeats() {
        let prog = parse_tape("[-]").unwrap();
        let text = render(&compile(&prog));
        let head = text.find("while_0:").unwrap();
        let test = text.find("b.eq whileend_0").unwrap();
        let back = text.find("b while_0").unwrap();
        let end = text.find("whileend_0:").unwrap();
        assert!(head < test && test < back && back < end);
    }

    #[test]
    fn nested_loops_get_path_labels() {
        let prog = parse_tape("[[+]][-]").unwrap();
        let labels = labels_of(&compile(&prog));
        assert!(labels.contains(&"while_0".to_string()));
        assert!(labels.contains(&"while_0.0".to_string()));
        assert!(labels.contains(&"while_1".to_string()));
    }

    #[test]
    fn loop_labels_never_collide() {
        // Two levels of nesting with siblings at both levels.
        let prog = parse_tape("[[-][-]][[+][+]]").unwrap();
        let labels = labels_of(&compile(&prog));
        let mut dedup = labels.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), labels.len(), "duplicate loop label in {labels:?}");
    }

    #[test]
    fn pointer_moves_stay_on_the_stack_slot() {
        let text = render(&compile(&parse_tape("><").unwrap()));
        assert!(text.contains("add x0, x0, #1"));
        assert!(text.contains("sub x0, x0, #1"));
        // The index is re-pushed, not left in a register.
        assert!(text.contains("str x0, [sp, #-16]!"));
    }

    #[test]
    fn io_goes_through_the_runtime_thunks() {
        let text = render(&compile(&parse_tape(".,").unwrap()));
        assert!(text.contains("bl _output_char"));
        assert!(text.contains("bl _input_char"));
        assert!(text.contains("strb w0, [x29, x1]"));
    }
}
