use logos::Logos;

/// The surface alphabet is three characters; every other byte is commentary
/// and skipped outright, so lexing cannot fail.
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
#[logos(skip r"[^ \t\n]+")]
pub enum Token {
    #[token(" ")]
    Space,
    #[token("\t")]
    Tab,
    #[token("\n")]
    Linefeed,
}

/// Tokenize, keeping each token's byte span for diagnostics.
pub fn lex(source: &str) -> Vec<(Token, std::ops::Range<usize>)> {
    Token::lexer(source)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
        .collect()
}
