use std::ops::Range;

use num_bigint::BigInt;

use crate::inst::{ArithOp, Cond, Instr, TapeInstr};
use crate::lexer::{lex, Token};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("source ends in the middle of a command")]
    TruncatedCommand { at: usize },
    #[error("unrecognized command sequence")]
    UnknownCommand { span: Range<usize> },
    #[error("number literal not terminated by a linefeed")]
    UnterminatedNumber { at: usize },
    #[error("label not terminated by a linefeed")]
    UnterminatedLabel { at: usize },
    #[error("']' with no matching '['")]
    UnmatchedClose { at: usize },
    #[error("'[' is never closed")]
    UnclosedOpen { at: usize },
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::TruncatedCommand { .. } => "WS-P001",
            ParseError::UnknownCommand { .. } => "WS-P002",
            ParseError::UnterminatedNumber { .. } => "WS-P003",
            ParseError::UnterminatedLabel { .. } => "WS-P004",
            ParseError::UnmatchedClose { .. } => "WS-P005",
            ParseError::UnclosedOpen { .. } => "WS-P006",
        }
    }

    /// Byte span to point the diagnostic caret at.
    pub fn span(&self) -> Range<usize> {
        match self {
            ParseError::TruncatedCommand { at }
            | ParseError::UnterminatedNumber { at }
            | ParseError::UnterminatedLabel { at }
            | ParseError::UnmatchedClose { at }
            | ParseError::UnclosedOpen { at } => *at..*at + 1,
            ParseError::UnknownCommand { span } => span.clone(),
        }
    }
}

type Result<T> = std::result::Result<T, ParseError>;

/// Token cursor over the lexed surface alphabet.
struct Parser {
    toks: Vec<(Token, Range<usize>)>,
    pos: usize,
    src_len: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Parser { toks: lex(source), pos: 0, src_len: source.len() }
    }

    /// Byte offset to blame when the source runs out.
    fn eof_at(&self) -> usize {
        self.src_len.saturating_sub(1)
    }

    fn next(&mut self) -> Result<(Token, Range<usize>)> {
        let t = self
            .toks
            .get(self.pos)
            .cloned()
            .ok_or(ParseError::TruncatedCommand { at: self.eof_at() })?;
        self.pos += 1;
        Ok(t)
    }

    /// Signed binary literal: sign (space positive, tab negative), digits
    /// (space 0, tab 1), linefeed terminator. No digits means zero.
    fn number(&mut self) -> Result<BigInt> {
        let start = self.pos;
        let (sign_tok, sign_span) = self.next()?;
        let negative = match sign_tok {
            Token::Space => false,
            Token::Tab => true,
            Token::Linefeed => {
                return Err(ParseError::UnknownCommand { span: sign_span });
            }
        };
        let mut value = BigInt::from(0);
        loop {
            match self.toks.get(self.pos) {
                Some((Token::Space, _)) => value *= 2,
                Some((Token::Tab, _)) => value = value * 2 + 1,
                Some((Token::Linefeed, _)) => {
                    self.pos += 1;
                    return Ok(if negative { -value } else { value });
                }
                None => {
                    let at = self.toks[start].1.start;
                    return Err(ParseError::UnterminatedNumber { at });
                }
            }
            self.pos += 1;
        }
    }

    /// Label token sequence, linefeed-terminated, encoded injectively into
    /// the symbol alphabet: space becomes `s`, tab becomes `t`. The empty
    /// sequence is a legal label.
    fn label(&mut self) -> Result<String> {
        let start_at =
            self.toks.get(self.pos).map(|(_, s)| s.start).unwrap_or_else(|| self.eof_at());
        let mut name = String::new();
        loop {
            match self.next() {
                Ok((Token::Space, _)) => name.push('s'),
                Ok((Token::Tab, _)) => name.push('t'),
                Ok((Token::Linefeed, _)) => return Ok(name),
                Err(_) => return Err(ParseError::UnterminatedLabel { at: start_at }),
            }
        }
    }

    fn command(&mut self) -> Result<Instr> {
        let (imp, _) = self.next()?;
        match imp {
            // Stack manipulation.
            Token::Space => {
                let (t, _) = self.next()?;
                match t {
                    Token::Space => Ok(Instr::Push(self.number()?)),
                    Token::Tab => {
                        let (t2, span2) = self.next()?;
                        match t2 {
                            Token::Space => Ok(Instr::Copy(self.small_number(&span2)?)),
                            Token::Linefeed => Ok(Instr::Slide(self.small_number(&span2)?)),
                            Token::Tab => Err(ParseError::UnknownCommand { span: span2 }),
                        }
                    }
                    Token::Linefeed => {
                        let (t2, _) = self.next()?;
                        match t2 {
                            Token::Space => Ok(Instr::Dup),
                            Token::Tab => Ok(Instr::Swap),
                            Token::Linefeed => Ok(Instr::Discard),
                        }
                    }
                }
            }
            Token::Tab => {
                let (page, _) = self.next()?;
                match page {
                    // Arithmetic.
                    Token::Space => {
                        let (a, sa) = self.next()?;
                        let (b, sb) = self.next()?;
                        match (a, b) {
                            (Token::Space, Token::Space) => Ok(Instr::Arith(ArithOp::Add)),
                            (Token::Space, Token::Tab) => Ok(Instr::Arith(ArithOp::Sub)),
                            (Token::Space, Token::Linefeed) => Ok(Instr::Arith(ArithOp::Mul)),
                            (Token::Tab, Token::Space) => Ok(Instr::Arith(ArithOp::Div)),
                            (Token::Tab, Token::Tab) => Ok(Instr::Arith(ArithOp::Mod)),
                            _ => Err(ParseError::UnknownCommand { span: sa.start..sb.end }),
                        }
                    }
                    // Heap access.
                    Token::Tab => {
                        let (t, span) = self.next()?;
                        match t {
                            Token::Space => Ok(Instr::Store),
                            Token::Tab => Ok(Instr::Retrieve),
                            Token::Linefeed => Err(ParseError::UnknownCommand { span }),
                        }
                    }
                    // I/O.
                    Token::Linefeed => {
                        let (a, sa) = self.next()?;
                        let (b, sb) = self.next()?;
                        match (a, b) {
                            (Token::Space, Token::Space) => Ok(Instr::OutputChar),
                            (Token::Space, Token::Tab) => Ok(Instr::OutputNum),
                            (Token::Tab, Token::Space) => Ok(Instr::InputChar),
                            (Token::Tab, Token::Tab) => Ok(Instr::InputNum),
                            _ => Err(ParseError::UnknownCommand { span: sa.start..sb.end }),
                        }
                    }
                }
            }
            // Control flow.
            Token::Linefeed => {
                let (a, sa) = self.next()?;
                let (b, sb) = self.next()?;
                match (a, b) {
                    (Token::Space, Token::Space) => Ok(Instr::Label(self.label()?)),
                    (Token::Space, Token::Tab) => Ok(Instr::Call(self.label()?)),
                    (Token::Space, Token::Linefeed) => Ok(Instr::Jump(self.label()?)),
                    (Token::Tab, Token::Space) => Ok(Instr::Branch(Cond::Zero, self.label()?)),
                    (Token::Tab, Token::Tab) => Ok(Instr::Branch(Cond::Neg, self.label()?)),
                    (Token::Tab, Token::Linefeed) => Ok(Instr::Return),
                    (Token::Linefeed, Token::Linefeed) => Ok(Instr::End),
                    _ => Err(ParseError::UnknownCommand { span: sa.start..sb.end }),
                }
            }
        }
    }

    /// `Copy`/`Slide` operands are depths; a negative depth has no meaning.
    fn small_number(&mut self, cmd_span: &Range<usize>) -> Result<usize> {
        use num_traits::ToPrimitive;
        let n = self.number()?;
        n.to_usize().ok_or(ParseError::UnknownCommand { span: cmd_span.clone() })
    }
}

/// Parse whitespace-alphabet source into an instruction list.
pub fn parse_ws(source: &str) -> Result<Vec<Instr>> {
    let mut p = Parser::new(source);
    let mut instrs = Vec::new();
    while p.pos < p.toks.len() {
        instrs.push(p.command()?);
    }
    Ok(instrs)
}

/// Parse byte-tape source: `> < + - . , [ ]`, all other bytes commentary.
pub fn parse_tape(source: &str) -> Result<Vec<TapeInstr>> {
    // Stack of open loop bodies; the bottom entry is the program itself.
    let mut frames: Vec<(usize, Vec<TapeInstr>)> = vec![(0, Vec::new())];
    for (at, c) in source.char_indices() {
        let instr = match c {
            '>' => TapeInstr::IncrPtr,
            '<' => TapeInstr::DecrPtr,
            '+' => TapeInstr::IncrByte,
            '-' => TapeInstr::DecrByte,
            '.' => TapeInstr::Output,
            ',' => TapeInstr::Input,
            '[' => {
                frames.push((at, Vec::new()));
                continue;
            }
            ']' => {
                let (_, body) = frames.pop().ok_or(ParseError::UnmatchedClose { at })?;
                if frames.is_empty() {
                    return Err(ParseError::UnmatchedClose { at });
                }
                TapeInstr::While(body)
            }
            _ => continue,
        };
        if let Some((_, body)) = frames.last_mut() {
            body.push(instr);
        }
    }
    match frames.len() {
        1 => {
            let (_, program) = frames.remove(0);
            Ok(program)
        }
        _ => {
            let (at, _) = frames[frames.len() - 1];
            Err(ParseError::UnclosedOpen { at })
        }
    }
}
