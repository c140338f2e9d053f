//! Logos-based lexer for PHP
//!
//! Fast tokenization using the logos crate. The top-level [`tokenize`]
//! alternates between inline-HTML mode and PHP mode on `<?php` / `?>`
//! boundaries; keywords are resolved case-insensitively in the wrapper.

use logos::Logos;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

/// A token with its kind, text, and byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: SmolStr,
    pub range: TextRange,
}

impl Token {
    pub fn start(&self) -> TextSize {
        self.range.start()
    }
}

/// Token kinds after keyword resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Trivia
    InlineHtml,
    OpenTag,
    OpenTagEcho,
    CloseTag,
    Whitespace,
    LineComment,
    BlockComment,
    DocComment,
    Error,

    // Literals and names
    Identifier,
    VariableName,
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    HeredocLiteral,

    // Punctuation
    Backslash,
    AttributeStart,
    Arrow,
    NullsafeArrow,
    DoubleColon,
    DoubleArrow,
    Ellipsis,
    Coalesce,
    CoalesceEq,
    Eq,
    EqEq,
    EqEqEq,
    BangEq,
    BangEqEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Spaceship,
    AmpAmp,
    PipePipe,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    DotEq,
    PercentEq,
    StarStar,
    StarStarEq,
    Shl,
    Shr,
    ShlEq,
    ShrEq,
    AmpEq,
    PipeEq,
    CaretEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Dot,
    Bang,
    Tilde,
    Amp,
    Pipe,
    Caret,
    Question,
    Colon,
    Semicolon,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    At,

    // Keywords (case-insensitive in PHP)
    AbstractKw,
    AndKw,
    ArrayKw,
    AsKw,
    BreakKw,
    CallableKw,
    CaseKw,
    CatchKw,
    ClassKw,
    CloneKw,
    ConstKw,
    ContinueKw,
    DeclareKw,
    DefaultKw,
    DoKw,
    EchoKw,
    ElseKw,
    ElseifKw,
    EnumKw,
    ExtendsKw,
    FinalKw,
    FinallyKw,
    FnKw,
    ForKw,
    ForeachKw,
    FunctionKw,
    GlobalKw,
    IfKw,
    ImplementsKw,
    InstanceofKw,
    InsteadofKw,
    InterfaceKw,
    ListKw,
    MatchKw,
    NamespaceKw,
    NewKw,
    OrKw,
    PrintKw,
    PrivateKw,
    ProtectedKw,
    PublicKw,
    ReadonlyKw,
    ReturnKw,
    StaticKw,
    SwitchKw,
    ThrowKw,
    TraitKw,
    TryKw,
    UseKw,
    VarKw,
    WhileKw,
    XorKw,
    YieldKw,
    Eof,
}

impl TokenKind {
    /// Trivia tokens are skipped by the parser (doc comments are tracked)
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace
                | TokenKind::LineComment
                | TokenKind::BlockComment
                | TokenKind::DocComment
                | TokenKind::InlineHtml
                | TokenKind::OpenTag
                | TokenKind::OpenTagEcho
                | TokenKind::CloseTag
        )
    }
}

/// Tokenize a whole document, alternating between inline HTML and PHP mode.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0usize;

    'html: while pos < input.len() {
        let rest = &input[pos..];
        let Some((tag_at, tag_len, echo)) = find_open_tag(rest) else {
            push_token(&mut tokens, TokenKind::InlineHtml, rest, pos);
            break;
        };
        if tag_at > 0 {
            push_token(&mut tokens, TokenKind::InlineHtml, &rest[..tag_at], pos);
        }
        let tag_kind = if echo {
            TokenKind::OpenTagEcho
        } else {
            TokenKind::OpenTag
        };
        push_token(
            &mut tokens,
            tag_kind,
            &rest[tag_at..tag_at + tag_len],
            pos + tag_at,
        );
        pos += tag_at + tag_len;

        // PHP mode until `?>` or end of input
        let php_base = pos;
        let mut lexer = LogosToken::lexer(&input[php_base..]);
        while let Some(result) = lexer.next() {
            let span = lexer.span();
            let text = lexer.slice();
            let abs = php_base + span.start;
            match result {
                Ok(LogosToken::CloseTag) => {
                    push_token(&mut tokens, TokenKind::CloseTag, text, abs);
                    pos = php_base + span.end;
                    continue 'html;
                }
                Ok(tok) => {
                    let kind = resolve_kind(tok, text);
                    push_token(&mut tokens, kind, text, abs);
                }
                Err(()) => push_token(&mut tokens, TokenKind::Error, text, abs),
            }
        }
        pos = input.len();
    }

    let end = TextSize::new(input.len() as u32);
    tokens.push(Token {
        kind: TokenKind::Eof,
        text: SmolStr::default(),
        range: TextRange::new(end, end),
    });
    tokens
}

fn push_token(tokens: &mut Vec<Token>, kind: TokenKind, text: &str, at: usize) {
    let start = TextSize::new(at as u32);
    let end = TextSize::new((at + text.len()) as u32);
    tokens.push(Token {
        kind,
        text: SmolStr::new(text),
        range: TextRange::new(start, end),
    });
}

/// Locate the next `<?php` or `<?=` tag. Returns (offset, length, is_echo).
fn find_open_tag(text: &str) -> Option<(usize, usize, bool)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while let Some(found) = text[i..].find("<?") {
        let at = i + found;
        let after = &bytes[at + 2..];
        if after.len() >= 3 && after[..3].eq_ignore_ascii_case(b"php") {
            // `<?php` must be followed by whitespace or end of input
            let boundary = after.get(3).is_none_or(|b| b.is_ascii_whitespace());
            if boundary {
                return Some((at, 5, false));
            }
        }
        if after.first() == Some(&b'=') {
            return Some((at, 3, true));
        }
        i = at + 2;
    }
    None
}

/// Resolve identifiers to keywords (PHP keywords are case-insensitive)
fn resolve_kind(tok: LogosToken, text: &str) -> TokenKind {
    match tok {
        LogosToken::Ident => keyword_kind(text).unwrap_or(TokenKind::Identifier),
        other => other.into(),
    }
}

fn keyword_kind(text: &str) -> Option<TokenKind> {
    // Keywords are short; fold case without allocating for the common
    // already-lowercase source
    let mut buf = [0u8; 12];
    if text.len() > buf.len() {
        return None;
    }
    for (i, b) in text.bytes().enumerate() {
        buf[i] = b.to_ascii_lowercase();
    }
    let folded = &buf[..text.len()];
    Some(match folded {
        b"abstract" => TokenKind::AbstractKw,
        b"and" => TokenKind::AndKw,
        b"array" => TokenKind::ArrayKw,
        b"as" => TokenKind::AsKw,
        b"break" => TokenKind::BreakKw,
        b"callable" => TokenKind::CallableKw,
        b"case" => TokenKind::CaseKw,
        b"catch" => TokenKind::CatchKw,
        b"class" => TokenKind::ClassKw,
        b"clone" => TokenKind::CloneKw,
        b"const" => TokenKind::ConstKw,
        b"continue" => TokenKind::ContinueKw,
        b"declare" => TokenKind::DeclareKw,
        b"default" => TokenKind::DefaultKw,
        b"do" => TokenKind::DoKw,
        b"echo" => TokenKind::EchoKw,
        b"else" => TokenKind::ElseKw,
        b"elseif" => TokenKind::ElseifKw,
        b"enum" => TokenKind::EnumKw,
        b"extends" => TokenKind::ExtendsKw,
        b"final" => TokenKind::FinalKw,
        b"finally" => TokenKind::FinallyKw,
        b"fn" => TokenKind::FnKw,
        b"for" => TokenKind::ForKw,
        b"foreach" => TokenKind::ForeachKw,
        b"function" => TokenKind::FunctionKw,
        b"global" => TokenKind::GlobalKw,
        b"if" => TokenKind::IfKw,
        b"implements" => TokenKind::ImplementsKw,
        b"instanceof" => TokenKind::InstanceofKw,
        b"insteadof" => TokenKind::InsteadofKw,
        b"interface" => TokenKind::InterfaceKw,
        b"list" => TokenKind::ListKw,
        b"match" => TokenKind::MatchKw,
        b"namespace" => TokenKind::NamespaceKw,
        b"new" => TokenKind::NewKw,
        b"or" => TokenKind::OrKw,
        b"print" => TokenKind::PrintKw,
        b"private" => TokenKind::PrivateKw,
        b"protected" => TokenKind::ProtectedKw,
        b"public" => TokenKind::PublicKw,
        b"readonly" => TokenKind::ReadonlyKw,
        b"return" => TokenKind::ReturnKw,
        b"static" => TokenKind::StaticKw,
        b"switch" => TokenKind::SwitchKw,
        b"throw" => TokenKind::ThrowKw,
        b"trait" => TokenKind::TraitKw,
        b"try" => TokenKind::TryKw,
        b"use" => TokenKind::UseKw,
        b"var" => TokenKind::VarKw,
        b"while" => TokenKind::WhileKw,
        b"xor" => TokenKind::XorKw,
        b"yield" => TokenKind::YieldKw,
        _ => return None,
    })
}

/// Logos token enum for PHP mode
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum LogosToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    #[regex(r"#(?:[^\[\n][^\n]*)?")]
    LineComment,

    // `/**` doc comment must be tried before the general block comment
    #[regex(r"/\*\*[^*]*\*+(?:[^/*][^*]*\*+)*/")]
    DocComment,

    #[regex(r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/")]
    BlockComment,

    #[token("?>")]
    CloseTag,

    // =========================================================================
    // LITERALS AND NAMES
    // =========================================================================
    #[regex(r"[a-zA-Z_\u{80}-\u{10FFFF}][a-zA-Z0-9_\u{80}-\u{10FFFF}]*")]
    Ident,

    #[regex(r"\$[a-zA-Z_\u{80}-\u{10FFFF}][a-zA-Z0-9_\u{80}-\u{10FFFF}]*")]
    VariableName,

    #[regex(r"0[xX][0-9a-fA-F_]+")]
    #[regex(r"0[bB][01_]+")]
    #[regex(r"0[oO][0-7_]+")]
    #[regex(r"[0-9][0-9_]*")]
    IntLiteral,

    #[regex(r"[0-9][0-9_]*\.[0-9_]*(?:[eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9][0-9_]*(?:[eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+")]
    FloatLiteral,

    #[regex(r"'(?:[^'\\]|\\.)*'")]
    #[regex(r#""(?:[^"\\]|\\.)*""#)]
    StringLiteral,

    #[token("<<<", lex_heredoc)]
    HeredocLiteral,

    // =========================================================================
    // MULTI-CHARACTER PUNCTUATION (maximal munch orders these)
    // =========================================================================
    #[token("#[")]
    AttributeStart,

    #[token("?->")]
    NullsafeArrow,

    #[token("->")]
    Arrow,

    #[token("::")]
    DoubleColon,

    #[token("=>")]
    DoubleArrow,

    #[token("...")]
    Ellipsis,

    #[token("??=")]
    CoalesceEq,

    #[token("??")]
    Coalesce,

    #[token("===")]
    EqEqEq,

    #[token("!==")]
    BangEqEq,

    #[token("==")]
    EqEq,

    #[token("!=")]
    #[token("<>")]
    BangEq,

    #[token("<=>")]
    Spaceship,

    #[token("<=")]
    LtEq,

    #[token(">=")]
    GtEq,

    #[token("&&")]
    AmpAmp,

    #[token("||")]
    PipePipe,

    #[token("++")]
    PlusPlus,

    #[token("--")]
    MinusMinus,

    #[token("+=")]
    PlusEq,

    #[token("-=")]
    MinusEq,

    #[token("*=")]
    StarEq,

    #[token("/=")]
    SlashEq,

    #[token(".=")]
    DotEq,

    #[token("%=")]
    PercentEq,

    #[token("**=")]
    StarStarEq,

    #[token("**")]
    StarStar,

    #[token("<<=")]
    ShlEq,

    #[token(">>=")]
    ShrEq,

    #[token("<<")]
    Shl,

    #[token(">>")]
    Shr,

    #[token("&=")]
    AmpEq,

    #[token("|=")]
    PipeEq,

    #[token("^=")]
    CaretEq,

    // =========================================================================
    // SINGLE-CHARACTER PUNCTUATION
    // =========================================================================
    #[token("\\")]
    Backslash,

    #[token("=")]
    Eq,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token(".")]
    Dot,

    #[token("!")]
    Bang,

    #[token("~")]
    Tilde,

    #[token("&")]
    Amp,

    #[token("|")]
    Pipe,

    #[token("^")]
    Caret,

    #[token("?")]
    Question,

    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("@")]
    At,

    #[token("$")]
    Dollar,
}

/// Consume a heredoc/nowdoc body after the `<<<` introducer.
///
/// Scans to the first line whose leading-whitespace-trimmed prefix is the
/// terminator identifier. Unterminated heredocs consume to end of input.
fn lex_heredoc(lex: &mut logos::Lexer<'_, LogosToken>) -> bool {
    let rest = lex.remainder();
    let bytes = rest.as_bytes();
    let mut i = 0;

    // Optional quotes: <<<'ID' (nowdoc) or <<<"ID"
    let quote = match bytes.first() {
        Some(b'\'') => {
            i += 1;
            Some(b'\'')
        }
        Some(b'"') => {
            i += 1;
            Some(b'"')
        }
        _ => None,
    };
    let id_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if i == id_start {
        return false;
    }
    let terminator = rest[id_start..i].to_owned();
    if quote.is_some() {
        if bytes.get(i) != quote.as_ref() {
            return false;
        }
        i += 1;
    }

    // Scan line by line for the terminator
    while i < bytes.len() {
        let line_start = match rest[i..].find('\n') {
            Some(nl) => i + nl + 1,
            None => {
                lex.bump(rest.len());
                return true;
            }
        };
        let line = &rest[line_start..];
        let trimmed_at = line.len() - line.trim_start_matches([' ', '\t']).len();
        let candidate = &line[trimmed_at..];
        if candidate.starts_with(&terminator) {
            let after = candidate.as_bytes().get(terminator.len());
            let ends = after.is_none_or(|b| !(b.is_ascii_alphanumeric() || *b == b'_'));
            if ends {
                lex.bump(line_start + trimmed_at + terminator.len());
                return true;
            }
        }
        i = line_start;
    }
    lex.bump(rest.len());
    true
}

impl From<LogosToken> for TokenKind {
    fn from(tok: LogosToken) -> Self {
        match tok {
            LogosToken::Whitespace => TokenKind::Whitespace,
            LogosToken::LineComment => TokenKind::LineComment,
            LogosToken::DocComment => TokenKind::DocComment,
            LogosToken::BlockComment => TokenKind::BlockComment,
            LogosToken::CloseTag => TokenKind::CloseTag,
            LogosToken::Ident => TokenKind::Identifier,
            LogosToken::VariableName => TokenKind::VariableName,
            LogosToken::IntLiteral => TokenKind::IntLiteral,
            LogosToken::FloatLiteral => TokenKind::FloatLiteral,
            LogosToken::StringLiteral => TokenKind::StringLiteral,
            LogosToken::HeredocLiteral => TokenKind::HeredocLiteral,
            LogosToken::AttributeStart => TokenKind::AttributeStart,
            LogosToken::NullsafeArrow => TokenKind::NullsafeArrow,
            LogosToken::Arrow => TokenKind::Arrow,
            LogosToken::DoubleColon => TokenKind::DoubleColon,
            LogosToken::DoubleArrow => TokenKind::DoubleArrow,
            LogosToken::Ellipsis => TokenKind::Ellipsis,
            LogosToken::CoalesceEq => TokenKind::CoalesceEq,
            LogosToken::Coalesce => TokenKind::Coalesce,
            LogosToken::EqEqEq => TokenKind::EqEqEq,
            LogosToken::BangEqEq => TokenKind::BangEqEq,
            LogosToken::EqEq => TokenKind::EqEq,
            LogosToken::BangEq => TokenKind::BangEq,
            LogosToken::Spaceship => TokenKind::Spaceship,
            LogosToken::LtEq => TokenKind::LtEq,
            LogosToken::GtEq => TokenKind::GtEq,
            LogosToken::AmpAmp => TokenKind::AmpAmp,
            LogosToken::PipePipe => TokenKind::PipePipe,
            LogosToken::PlusPlus => TokenKind::PlusPlus,
            LogosToken::MinusMinus => TokenKind::MinusMinus,
            LogosToken::PlusEq => TokenKind::PlusEq,
            LogosToken::MinusEq => TokenKind::MinusEq,
            LogosToken::StarEq => TokenKind::StarEq,
            LogosToken::SlashEq => TokenKind::SlashEq,
            LogosToken::DotEq => TokenKind::DotEq,
            LogosToken::PercentEq => TokenKind::PercentEq,
            LogosToken::StarStarEq => TokenKind::StarStarEq,
            LogosToken::StarStar => TokenKind::StarStar,
            LogosToken::ShlEq => TokenKind::ShlEq,
            LogosToken::ShrEq => TokenKind::ShrEq,
            LogosToken::Shl => TokenKind::Shl,
            LogosToken::Shr => TokenKind::Shr,
            LogosToken::AmpEq => TokenKind::AmpEq,
            LogosToken::PipeEq => TokenKind::PipeEq,
            LogosToken::CaretEq => TokenKind::CaretEq,
            LogosToken::Backslash => TokenKind::Backslash,
            LogosToken::Eq => TokenKind::Eq,
            LogosToken::Lt => TokenKind::Lt,
            LogosToken::Gt => TokenKind::Gt,
            LogosToken::Plus => TokenKind::Plus,
            LogosToken::Minus => TokenKind::Minus,
            LogosToken::Star => TokenKind::Star,
            LogosToken::Slash => TokenKind::Slash,
            LogosToken::Percent => TokenKind::Percent,
            LogosToken::Dot => TokenKind::Dot,
            LogosToken::Bang => TokenKind::Bang,
            LogosToken::Tilde => TokenKind::Tilde,
            LogosToken::Amp => TokenKind::Amp,
            LogosToken::Pipe => TokenKind::Pipe,
            LogosToken::Caret => TokenKind::Caret,
            LogosToken::Question => TokenKind::Question,
            LogosToken::Colon => TokenKind::Colon,
            LogosToken::Semicolon => TokenKind::Semicolon,
            LogosToken::Comma => TokenKind::Comma,
            LogosToken::LParen => TokenKind::LParen,
            LogosToken::RParen => TokenKind::RParen,
            LogosToken::LBracket => TokenKind::LBracket,
            LogosToken::RBracket => TokenKind::RBracket,
            LogosToken::LBrace => TokenKind::LBrace,
            LogosToken::RBrace => TokenKind::RBrace,
            LogosToken::At => TokenKind::At,
            LogosToken::Dollar => TokenKind::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !matches!(k, TokenKind::Whitespace | TokenKind::Eof))
            .collect()
    }

    #[test]
    fn test_open_tag_and_keywords() {
        let toks = kinds("<?php class Foo {}");
        assert_eq!(
            toks,
            vec![
                TokenKind::OpenTag,
                TokenKind::ClassKw,
                TokenKind::Identifier,
                TokenKind::LBrace,
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let toks = kinds("<?php CLASS Foo EXTENDS Bar {}");
        assert_eq!(toks[1], TokenKind::ClassKw);
        assert_eq!(toks[3], TokenKind::ExtendsKw);
    }

    #[test]
    fn test_variables_and_members() {
        let toks = kinds("<?php $a->b()?->c;");
        assert_eq!(
            toks,
            vec![
                TokenKind::OpenTag,
                TokenKind::VariableName,
                TokenKind::Arrow,
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::NullsafeArrow,
                TokenKind::Identifier,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_doc_comment_vs_block_comment() {
        let toks = kinds("<?php /** doc */ /* plain */ $x;");
        assert_eq!(toks[1], TokenKind::DocComment);
        assert_eq!(toks[2], TokenKind::BlockComment);
    }

    #[test]
    fn test_hash_comment_vs_attribute() {
        let toks = kinds("<?php # comment\n#[Attr] $x;");
        assert_eq!(toks[1], TokenKind::LineComment);
        assert_eq!(toks[2], TokenKind::AttributeStart);
    }

    #[test]
    fn test_inline_html_round_trip() {
        let tokens = tokenize("<p>x</p><?php $a; ?><p>y</p>");
        assert_eq!(tokens[0].kind, TokenKind::InlineHtml);
        assert_eq!(tokens[0].text, "<p>x</p>");
        assert!(tokens.iter().any(|t| t.kind == TokenKind::CloseTag));
        assert_eq!(
            tokens[tokens.len() - 2].kind,
            TokenKind::InlineHtml,
            "trailing html resumes after close tag"
        );
    }

    #[test]
    fn test_heredoc() {
        let toks = kinds("<?php $a = <<<EOT\nhello $name\nEOT;\n");
        assert!(toks.contains(&TokenKind::HeredocLiteral));
        assert_eq!(*toks.last().unwrap(), TokenKind::Semicolon);
    }

    #[test]
    fn test_namespace_separator() {
        let toks = kinds("<?php \\A\\B::c();");
        assert_eq!(toks[1], TokenKind::Backslash);
        assert_eq!(toks[3], TokenKind::Backslash);
        assert_eq!(toks[5], TokenKind::DoubleColon);
    }

    #[test]
    fn test_numbers() {
        let toks = kinds("<?php 1 1.5 0x1F 1e3 .5;");
        assert_eq!(toks[1], TokenKind::IntLiteral);
        assert_eq!(toks[2], TokenKind::FloatLiteral);
        assert_eq!(toks[3], TokenKind::IntLiteral);
        assert_eq!(toks[4], TokenKind::FloatLiteral);
        assert_eq!(toks[5], TokenKind::FloatLiteral);
    }

    #[test]
    fn test_token_ranges_are_absolute() {
        let tokens = tokenize("<?php $a;");
        let var = tokens
            .iter()
            .find(|t| t.kind == TokenKind::VariableName)
            .unwrap();
        assert_eq!(u32::from(var.range.start()), 6);
        assert_eq!(u32::from(var.range.end()), 8);
    }
}
