//! A small lexer for a C-like language built on one valued machine.
//!
//! Keywords, punctuation, identifiers, and number literals all live in the
//! same table; longest-prefix lookup drives the token loop.

use tablewalk::{presets, StateMachine};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Token {
    KwInt,
    KwFloat,
    KwFor,
    KwWhile,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    LBrace,
    RBrace,
    IntLiteral,
    FloatLiteral,
    Identifier,
    Whitespace,
}

fn build() -> Result<StateMachine<Token>, Box<dyn std::error::Error>> {
    let mut m: StateMachine<Token> = StateMachine::new();
    m.match_sequence(b"int").commit(Token::KwInt)?;
    m.match_sequence(b"float").commit(Token::KwFloat)?;
    m.match_sequence(b"for").commit(Token::KwFor)?;
    m.match_sequence(b"while").commit(Token::KwWhile)?;
    m.match_sequence(b"+").commit(Token::Plus)?;
    m.match_sequence(b"-").commit(Token::Minus)?;
    m.match_sequence(b"*").commit(Token::Star)?;
    m.match_sequence(b"/").commit(Token::Slash)?;
    m.match_sequence(b"(").commit(Token::LParen)?;
    m.match_sequence(b")").commit(Token::RParen)?;
    m.match_sequence(b"{").commit(Token::LBrace)?;
    m.match_sequence(b"}").commit(Token::RBrace)?;

    m.match_pattern(&presets::integer())?;
    m.commit(Token::IntLiteral)?;
    m.match_pattern(&presets::float())?;
    m.commit(Token::FloatLiteral)?;

    // Identifiers last, and with Skip: keywords already own their exact
    // spellings, the identifier paths fill in everything else.
    m.conflict(tablewalk::Conflict::Skip);
    m.match_pattern(&presets::identifier())?;
    m.commit(Token::Identifier)?;

    let mut ws = tablewalk::Regex::new();
    ws.match_whitespace().terminal()?;
    m.match_many(&ws)?;
    m.commit(Token::Whitespace)?;

    m.optimize();
    Ok(m)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let machine = build()?;
    let source = b"for (i = 10) { x + 3.5 } while grace";

    let mut pos = 0;
    while pos < source.len() {
        match machine.lookup(&source[pos..]) {
            Some((len, token)) if len > 0 => {
                if *token != Token::Whitespace {
                    println!(
                        "{:?}: {:?}",
                        token,
                        String::from_utf8_lossy(&source[pos..pos + len])
                    );
                }
                pos += len;
            }
            _ => {
                println!("skip: {:?}", source[pos] as char);
                pos += 1;
            }
        }
    }
    Ok(())
}
