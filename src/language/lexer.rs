use crate::language::span::Span;
use crate::language::token::{Token, TokenKind};
use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit0, digit1},
    combinator::{map_res, opt, recognize},
    sequence::{pair, tuple},
    IResult, Parser as NomParser,
};

#[derive(Clone, Debug)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

fn lex_lparen(input: &str) -> IResult<&str, TokenKind> {
    let (input, _) = char('(')(input)?;
    Ok((input, TokenKind::LParen))
}

fn lex_rparen(input: &str) -> IResult<&str, TokenKind> {
    let (input, _) = char(')')(input)?;
    Ok((input, TokenKind::RParen))
}

// Optional sign, digits, at most one dot. The dot decides Integer vs Float.
fn lex_number(input: &str) -> IResult<&str, TokenKind> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit0)),
        ))),
        |text: &str| -> Result<TokenKind, String> {
            if text.contains('.') {
                text.parse::<f64>()
                    .map(TokenKind::Float)
                    .map_err(|err| err.to_string())
            } else {
                text.parse::<i64>()
                    .map(TokenKind::Integer)
                    .map_err(|err| err.to_string())
            }
        },
    )
    .parse(input)
}

fn lex_identifier(input: &str) -> IResult<&str, TokenKind> {
    let (input, ident) = recognize(pair(
        take_while1(|ch: char| ch.is_ascii_alphabetic() || ch == '_'),
        take_while(|ch: char| ch.is_ascii_alphanumeric() || ch == '_'),
    ))
    .parse(input)?;
    Ok((input, TokenKind::Identifier(ident.to_string())))
}

fn lex_token(input: &str) -> IResult<&str, TokenKind> {
    alt((lex_number, lex_lparen, lex_rparen, lex_identifier)).parse(input)
}

/// Tokenizes a whole source text, skipping whitespace and `;` line comments.
/// Byte offsets are tracked so every token carries its source span.
pub fn lex(source: &str) -> Result<Vec<Token>, Vec<LexError>> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut rest = source;
    let mut offset = 0usize;

    loop {
        let trimmed = rest.trim_start();
        offset += rest.len() - trimmed.len();
        rest = trimmed;

        if let Some(stripped) = rest.strip_prefix(';') {
            let skipped = stripped.find('\n').map_or(rest.len(), |pos| pos + 2);
            offset += skipped;
            rest = &rest[skipped..];
            continue;
        }

        if rest.is_empty() {
            break;
        }

        match lex_token(rest) {
            Ok((remaining, kind)) => {
                let consumed = rest.len() - remaining.len();
                tokens.push(Token {
                    kind,
                    span: Span::new(offset, offset + consumed),
                });
                offset += consumed;
                rest = remaining;
            }
            Err(_) => {
                let width = rest.chars().next().map_or(1, char::len_utf8);
                errors.push(LexError {
                    message: format!("Unexpected character `{}`", &rest[..width]),
                    span: Span::new(offset, offset + width),
                });
                offset += width;
                rest = &rest[width..];
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(offset, offset),
    });

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}
