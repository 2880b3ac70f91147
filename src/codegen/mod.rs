//! ARM64 backends. Both source languages share one runtime picture: a
//! `.data` section with a 20-byte I/O scratch buffer, the 30,000-byte
//! `array` region, and a return-address stack; `x29` holds the base of
//! `array` for the life of the program, `x28` the return-stack top. The
//! operand stack (and the tape backend's data pointer) live on `sp` in
//! 16-byte slots.

pub mod asm;
pub mod tape;
pub mod ws;

pub use self::tape::compile as compile_tape;
pub use self::ws::compile as compile_ws;

use self::asm::{Arm64, CondCode, Reg};

/// Base address of `array`, set once in the prologue.
pub(crate) const HEAP_BASE: Reg = Reg::X(29);
/// Top of the software return stack, set once in the prologue.
pub(crate) const RETSTACK: Reg = Reg::X(28);

const X0: Reg = Reg::X(0);
const X1: Reg = Reg::X(1);
const X2: Reg = Reg::X(2);
const X3: Reg = Reg::X(3);
const X4: Reg = Reg::X(4);
const X5: Reg = Reg::X(5);
const X6: Reg = Reg::X(6);
const X7: Reg = Reg::X(7);
const X8: Reg = Reg::X(8);
const X16: Reg = Reg::X(16);

// macOS-convention syscall numbers, issued with the number in x16.
const SYS_EXIT: i64 = 1;
const SYS_READ: i64 = 3;
const SYS_WRITE: i64 = 4;

/// Fixed header: storage reservations, text directives, `_start` setting up
/// the register picture and the zero sentinel slot.
pub(crate) fn prologue() -> Vec<Arm64> {
    use Arm64::*;
    vec![
        SectData,
        Balign(4),
        Skip { label: "buf".into(), bytes: 20 },
        Balign(4),
        Skip { label: "array".into(), bytes: 30000 },
        Balign(8),
        Skip { label: "retstack".into(), bytes: 4096 },
        SectText,
        Global("_start".into()),
        Balign(16),
        Label("_start".into()),
        Adr(HEAP_BASE, "array".into()),
        Adr(RETSTACK, "retstack".into()),
        MovImm(X0, 0),
        Psh(X0),
    ]
}

/// Fixed footer: the exit point every `End` branches to, then the four
/// runtime I/O routines. The routines are leaves; they clobber only x0-x8
/// and x16, so the callee-saved registers the emitters lean on survive.
pub(crate) fn epilogue() -> Vec<Arm64> {
    use Arm64::*;
    let mut out = vec![
        Label("terminate".into()),
        MovImm(X0, 0),
        MovImm(X16, SYS_EXIT),
        Svc(0x80),
    ];

    // Write the low byte of x0 to stdout.
    out.extend([
        Label("_output_char".into()),
        Adr(X1, "buf".into()),
        Strb(X0, X1, 0),
        MovImm(X0, 1),
        MovImm(X2, 1),
        MovImm(X16, SYS_WRITE),
        Svc(0x80),
        Ret,
    ]);

    // Read one byte from stdin into x0; end-of-input reads as zero.
    out.extend([
        Label("_input_char".into()),
        Adr(X1, "buf".into()),
        MovImm(X3, 0),
        Strb(X3, X1, 0),
        MovImm(X0, 0),
        MovImm(X2, 1),
        MovImm(X16, SYS_READ),
        Svc(0x80),
        Adr(X1, "buf".into()),
        Ldrb(X0, X1, 0),
        Ret,
    ]);

    // Print x0 in signed decimal. Digits are built back-to-front at the end
    // of buf, the sign prepended last, then one write syscall.
    out.extend([
        Label("_output_num".into()),
        Adr(X1, "buf".into()),
        AddImm(X4, X1, 20),
        MovImm(X5, 10),
        Mov(X6, X0),
        CmpImm(X0, 0),
        Bc(CondCode::Ge, "onum_next".into()),
        Neg(X0, X0),
        Label("onum_next".into()),
        Sdiv(X2, X0, X5),
        Msub(X3, X2, X5, X0),
        AddImm(X3, X3, 48),
        SubImm(X4, X4, 1),
        Strb(X3, X4, 0),
        Mov(X0, X2),
        CmpImm(X0, 0),
        Bc(CondCode::Ne, "onum_next".into()),
        CmpImm(X6, 0),
        Bc(CondCode::Ge, "onum_write".into()),
        MovImm(X3, 45),
        SubImm(X4, X4, 1),
        Strb(X3, X4, 0),
        Label("onum_write".into()),
        MovImm(X0, 1),
        Mov(X1, X4),
        Adr(X2, "buf".into()),
        AddImm(X2, X2, 20),
        Sub(X2, X2, X4),
        MovImm(X16, SYS_WRITE),
        Svc(0x80),
        Ret,
    ]);

    // Read a signed decimal line from stdin into x0. Consumes through the
    // linefeed; end-of-input ends the number as a linefeed would.
    out.extend([
        Label("_input_num".into()),
        MovImm(X7, 0),
        MovImm(X8, 0),
        MovImm(X5, 10),
        Label("inum_next".into()),
        Adr(X1, "buf".into()),
        MovImm(X3, 0),
        Strb(X3, X1, 0),
        MovImm(X0, 0),
        MovImm(X2, 1),
        MovImm(X16, SYS_READ),
        Svc(0x80),
        CmpImm(X0, 0),
        Bc(CondCode::Eq, "inum_done".into()),
        Adr(X1, "buf".into()),
        Ldrb(X3, X1, 0),
        CmpImm(X3, 10),
        Bc(CondCode::Eq, "inum_done".into()),
        CmpImm(X3, 45),
        Bc(CondCode::Ne, "inum_digit".into()),
        MovImm(X8, 1),
        B("inum_next".into()),
        Label("inum_digit".into()),
        SubImm(X3, X3, 48),
        Mul(X7, X7, X5),
        Add(X7, X7, X3),
        B("inum_next".into()),
        Label("inum_done".into()),
        CmpImm(X8, 0),
        Bc(CondCode::Eq, "inum_store".into()),
        Neg(X7, X7),
        Label("inum_store".into()),
        Mov(X0, X7),
        Ret,
    ]);

    out
}

/// Materialize an arbitrary 64-bit immediate. Small values use the `mov`
/// alias; anything wider is built movz-then-movk over the nonzero 16-bit
/// chunks, which is bit-exact for negatives too.
pub(crate) fn mov_imm64(out: &mut Vec<Arm64>, reg: Reg, value: i64) {
    if (-0xffff..=0xffff).contains(&value) {
        out.push(Arm64::MovImm(reg, value));
        return;
    }
    let bits = value as u64;
    let mut placed = false;
    for chunk in 0..4u8 {
        let half = ((bits >> (16 * chunk)) & 0xffff) as u16;
        if half == 0 {
            continue;
        }
        if placed {
            out.push(Arm64::Movk(reg, half, 16 * chunk));
        } else {
            // movz clears the rest of the register, covering zero chunks.
            out.push(Arm64::Movz(reg, half, 16 * chunk));
            placed = true;
        }
    }
    if !placed {
        out.push(Arm64::Movz(reg, 0, 0));
    }
}
