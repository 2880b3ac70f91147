//! ARM64 instructions as first-class values, and the printer that turns each
//! one into exactly one line of GNU/Apple-AS syntax. The printer is the only
//! place assembly text is produced; the emitters build values.

use std::fmt;

/// General-purpose register operand. Byte-width loads and stores render the
/// 32-bit `w` alias themselves; everywhere else the `x` name is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    X(u8),
    Sp,
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reg::X(n) => write!(f, "x{n}"),
            Reg::Sp => write!(f, "sp"),
        }
    }
}

/// The 32-bit alias of a register, for byte-width accesses.
fn w_alias(reg: Reg) -> String {
    match reg {
        Reg::X(n) => format!("w{n}"),
        Reg::Sp => "wsp".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondCode {
    Eq,
    Ne,
    Ge,
    Lt,
}

impl fmt::Display for CondCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CondCode::Eq => "eq",
            CondCode::Ne => "ne",
            CondCode::Ge => "ge",
            CondCode::Lt => "lt",
        };
        f.write_str(s)
    }
}

/// One line of the generated program: a directive, a label, a comment, or an
/// instruction. `Psh`/`Pop` are the 16-byte-aligned stack pseudo-ops the
/// operand-stack model is built on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arm64 {
    SectData,
    SectText,
    Balign(u32),
    Global(String),
    /// `label: .skip bytes` storage reservation.
    Skip { label: String, bytes: u32 },
    Label(String),
    Comment(String),

    Mov(Reg, Reg),
    MovImm(Reg, i64),
    Movz(Reg, u16, u8),
    Movk(Reg, u16, u8),

    Add(Reg, Reg, Reg),
    AddImm(Reg, Reg, i64),
    Sub(Reg, Reg, Reg),
    SubImm(Reg, Reg, i64),
    Mul(Reg, Reg, Reg),
    Sdiv(Reg, Reg, Reg),
    /// `msub d, n, m, a` computes a - n*m; paired with `sdiv` it yields the
    /// truncated remainder.
    Msub(Reg, Reg, Reg, Reg),
    Neg(Reg, Reg),
    LslImm(Reg, Reg, u8),

    Ldr(Reg, Reg, i32),
    Str(Reg, Reg, i32),
    /// Pre-indexed load with writeback: `ldr d, [base, #off]!`
    LdrPre(Reg, Reg, i32),
    /// Post-indexed store with writeback: `str s, [base], #off`
    StrPost(Reg, Reg, i32),
    LdrReg(Reg, Reg, Reg),
    StrReg(Reg, Reg, Reg),
    Ldrb(Reg, Reg, i32),
    Strb(Reg, Reg, i32),
    LdrbReg(Reg, Reg, Reg),
    StrbReg(Reg, Reg, Reg),

    /// Push one 64-bit value in a 16-byte slot: `str r, [sp, #-16]!`
    Psh(Reg),
    /// Pop the 16-byte slot back: `ldr r, [sp], #16`
    Pop(Reg),
    Adr(Reg, String),

    Cmp(Reg, Reg),
    CmpImm(Reg, i64),
    B(String),
    Bc(CondCode, String),
    Bl(String),
    Br(Reg),
    Ret,
    Svc(u32),
}

impl fmt::Display for Arm64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arm64::SectData => write!(f, ".data"),
            Arm64::SectText => write!(f, ".text"),
            Arm64::Balign(n) => write!(f, ".balign {n}"),
            Arm64::Global(sym) => write!(f, ".global {sym}"),
            Arm64::Skip { label, bytes } => write!(f, "{label}: .skip {bytes}"),
            Arm64::Label(l) => write!(f, "{l}:"),
            Arm64::Comment(text) => write!(f, "    // {text}"),

            Arm64::Mov(d, s) => write!(f, "    mov {d}, {s}"),
            Arm64::MovImm(d, imm) => write!(f, "    mov {d}, #{imm}"),
            Arm64::Movz(d, imm, 0) => write!(f, "    movz {d}, #{imm}"),
            Arm64::Movz(d, imm, sh) => write!(f, "    movz {d}, #{imm}, lsl #{sh}"),
            Arm64::Movk(d, imm, sh) => write!(f, "    movk {d}, #{imm}, lsl #{sh}"),

            Arm64::Add(d, n, m) => write!(f, "    add {d}, {n}, {m}"),
            Arm64::AddImm(d, n, imm) => write!(f, "    add {d}, {n}, #{imm}"),
            Arm64::Sub(d, n, m) => write!(f, "    sub {d}, {n}, {m}"),
            Arm64::SubImm(d, n, imm) => write!(f, "    sub {d}, {n}, #{imm}"),
            Arm64::Mul(d, n, m) => write!(f, "    mul {d}, {n}, {m}"),
            Arm64::Sdiv(d, n, m) => write!(f, "    sdiv {d}, {n}, {m}"),
            Arm64::Msub(d, n, m, a) => write!(f, "    msub {d}, {n}, {m}, {a}"),
            Arm64::Neg(d, n) => write!(f, "    neg {d}, {n}"),
            Arm64::LslImm(d, n, sh) => write!(f, "    lsl {d}, {n}, #{sh}"),

            Arm64::Ldr(d, b, 0) => write!(f, "    ldr {d}, [{b}]"),
            Arm64::Ldr(d, b, off) => write!(f, "    ldr {d}, [{b}, #{off}]"),
            Arm64::Str(s, b, 0) => write!(f, "    str {s}, [{b}]"),
            Arm64::Str(s, b, off) => write!(f, "    str {s}, [{b}, #{off}]"),
            Arm64::LdrPre(d, b, off) => write!(f, "    ldr {d}, [{b}, #{off}]!"),
            Arm64::StrPost(s, b, off) => write!(f, "    str {s}, [{b}], #{off}"),
            Arm64::LdrReg(d, b, i) => write!(f, "    ldr {d}, [{b}, {i}]"),
            Arm64::StrReg(s, b, i) => write!(f, "    str {s}, [{b}, {i}]"),
            Arm64::Ldrb(d, b, 0) => write!(f, "    ldrb {}, [{b}]", w_alias(*d)),
            Arm64::Ldrb(d, b, off) => write!(f, "    ldrb {}, [{b}, #{off}]", w_alias(*d)),
            Arm64::Strb(s, b, 0) => write!(f, "    strb {}, [{b}]", w_alias(*s)),
            Arm64::Strb(s, b, off) => write!(f, "    strb {}, [{b}, #{off}]", w_alias(*s)),
            Arm64::LdrbReg(d, b, i) => write!(f, "    ldrb {}, [{b}, {i}]", w_alias(*d)),
            Arm64::StrbReg(s, b, i) => write!(f, "    strb {}, [{b}, {i}]", w_alias(*s)),

            Arm64::Psh(r) => write!(f, "    str {r}, [sp, #-16]!"),
            Arm64::Pop(r) => write!(f, "    ldr {r}, [sp], #16"),
            Arm64::Adr(d, sym) => write!(f, "    adr {d}, {sym}"),

            Arm64::Cmp(n, m) => write!(f, "    cmp {n}, {m}"),
            Arm64::CmpImm(n, imm) => write!(f, "    cmp {n}, #{imm}"),
            Arm64::B(l) => write!(f, "    b {l}"),
            Arm64::Bc(cond, l) => write!(f, "    b.{cond} {l}"),
            Arm64::Bl(l) => write!(f, "    bl {l}"),
            Arm64::Br(r) => write!(f, "    br {r}"),
            Arm64::Ret => write!(f, "    ret"),
            Arm64::Svc(imm) => write!(f, "    svc #0x{imm:x}"),
        }
    }
}

/// Render a whole program, one line per value, trailing newline included.
pub fn render(program: &[Arm64]) -> String {
    let mut out = String::new();
    for instr in program {
        out.push_str(&instr.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_of_each() -> Vec<Arm64> {
        use Arm64::*;
        let (a, b, c, d) = (Reg::X(0), Reg::X(1), Reg::X(2), Reg::X(3));
        vec![
            SectData,
            SectText,
            Balign(16),
            Global("_start".into()),
            Skip { label: "buf".into(), bytes: 20 },
            Label("w_l".into()),
            Comment("anchor".into()),
            Mov(a, b),
            MovImm(a, -7),
            Movz(a, 1, 0),
            Movz(a, 1, 16),
            Movk(a, 2, 32),
            Add(a, b, c),
            AddImm(a, b, 16),
            Sub(a, b, c),
            SubImm(a, b, 1),
            Mul(a, b, c),
            Sdiv(a, b, c),
            Msub(a, b, c, d),
            Neg(a, a),
            LslImm(a, a, 3),
            Ldr(a, Reg::Sp, 0),
            Ldr(a, Reg::Sp, 32),
            Str(a, b, 8),
            LdrPre(a, b, -8),
            StrPost(a, b, 8),
            LdrReg(a, b, c),
            StrReg(a, b, c),
            Ldrb(a, b, 0),
            Strb(a, b, 4),
            LdrbReg(a, b, c),
            StrbReg(a, b, c),
            Psh(a),
            Pop(a),
            Adr(a, "array".into()),
            Cmp(a, b),
            CmpImm(a, 0),
            B("w_l".into()),
            Bc(CondCode::Eq, "w_l".into()),
            Bl("_output_char".into()),
            Br(a),
            Ret,
            Svc(0x80),
        ]
    }

    #[test]
    fn every_value_renders_to_one_nonempty_line() {
        for instr in one_of_each() {
            let line = instr.to_string();
            assert!(!line.trim().is_empty(), "empty render for {instr:?}");
            assert!(!line.contains('\n'), "multi-line render for {instr:?}");
        }
    }

    #[test]
    fn render_joins_with_newlines() {
        let prog = one_of_each();
        let text = render(&prog);
        assert_eq!(text.lines().count(), prog.len());
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn exact_syntax_spot_checks() {
        assert_eq!(Arm64::Psh(Reg::X(0)).to_string(), "    str x0, [sp, #-16]!");
        assert_eq!(Arm64::Pop(Reg::X(1)).to_string(), "    ldr x1, [sp], #16");
        assert_eq!(Arm64::Strb(Reg::X(3), Reg::X(4), 0).to_string(), "    strb w3, [x4]");
        assert_eq!(
            Arm64::LdrbReg(Reg::X(1), Reg::X(29), Reg::X(0)).to_string(),
            "    ldrb w1, [x29, x0]"
        );
        assert_eq!(Arm64::Bc(CondCode::Lt, "w_neg".into()).to_string(), "    b.lt w_neg");
        assert_eq!(Arm64::Svc(0x80).to_string(), "    svc #0x80");
        assert_eq!(
            Arm64::Skip { label: "array".into(), bytes: 30000 }.to_string(),
            "array: .skip 30000"
        );
        assert_eq!(Arm64::Movz(Reg::X(0), 4660, 16).to_string(), "    movz x0, #4660, lsl #16");
    }
}
