//! Lexical scanning of hand-written SQL.
//!
//! The validator and the placeholder scanner never build an AST. They work
//! on masked copies of the input: comments (and optionally string literal
//! contents) are overwritten with spaces so keyword searches cannot match
//! inside them. Masking keeps every byte offset stable, so positions found
//! in a masked copy point at the same text in the original.

/// What to blank out besides comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mask {
    /// `--` line comments and `/* */` block comments.
    Comments,
    /// Comments plus the contents of `'...'` string literals. Quotes stay.
    CommentsAndLiterals,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    String,
    QuotedIdent,
    LineComment,
    BlockComment,
}

/// Return a copy of `sql` with the requested regions replaced by spaces.
///
/// Newlines inside comments survive so line numbers stay meaningful.
/// Unterminated comments and literals run to the end of the input.
pub fn mask(sql: &str, mode: Mask) -> String {
    let bytes = sql.as_bytes();
    let mut out = bytes.to_vec();
    let mut state = State::Code;
    let mut i = 0;

    let blank = |out: &mut Vec<u8>, at: usize| {
        if out[at] != b'\n' {
            out[at] = b' ';
        }
    };

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();

        match state {
            State::Code => match (b, next) {
                (b'-', Some(b'-')) => {
                    state = State::LineComment;
                    blank(&mut out, i);
                    blank(&mut out, i + 1);
                    i += 1;
                }
                (b'/', Some(b'*')) => {
                    state = State::BlockComment;
                    blank(&mut out, i);
                    blank(&mut out, i + 1);
                    i += 1;
                }
                (b'\'', _) => state = State::String,
                (b'"', _) => state = State::QuotedIdent,
                _ => {}
            },

            State::String => {
                if b == b'\'' {
                    if next == Some(b'\'') {
                        // '' is an escaped quote inside the literal
                        if mode == Mask::CommentsAndLiterals {
                            blank(&mut out, i);
                            blank(&mut out, i + 1);
                        }
                        i += 1;
                    } else {
                        state = State::Code;
                    }
                } else if mode == Mask::CommentsAndLiterals {
                    blank(&mut out, i);
                }
            }

            State::QuotedIdent => {
                if b == b'"' {
                    state = State::Code;
                }
            }

            State::LineComment => {
                if b == b'\n' {
                    state = State::Code;
                } else {
                    blank(&mut out, i);
                }
            }

            State::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    blank(&mut out, i);
                    blank(&mut out, i + 1);
                    state = State::Code;
                    i += 1;
                } else {
                    blank(&mut out, i);
                }
            }
        }

        i += 1;
    }

    // Masked regions always start and end on ASCII delimiters, so whole
    // characters are replaced and the buffer stays valid UTF-8.
    String::from_utf8_lossy(&out).into_owned()
}

pub fn mask_comments(sql: &str) -> String {
    mask(sql, Mask::Comments)
}

pub fn mask_literals(sql: &str) -> String {
    mask(sql, Mask::CommentsAndLiterals)
}

/// A lexeme of masked SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexemeKind<'a> {
    /// A run of letters, digits, `_` and `$`; quoted identifiers yield
    /// their inner text.
    Word(&'a str),
    /// Any other non-whitespace character.
    Punct(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub kind: LexemeKind<'a>,
    /// Byte offset into the scanned text.
    pub offset: usize,
    /// Parenthesis nesting depth. An opening paren carries the depth
    /// outside it; its contents are one deeper.
    pub depth: usize,
}

impl<'a> Lexeme<'a> {
    pub fn word(&self) -> Option<&'a str> {
        match self.kind {
            LexemeKind::Word(w) => Some(w),
            LexemeKind::Punct(_) => None,
        }
    }

    /// Case-insensitive keyword match.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.word().is_some_and(|w| w.eq_ignore_ascii_case(keyword))
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == LexemeKind::Punct(c)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn closing_quote(c: char) -> Option<char> {
    match c {
        '"' => Some('"'),
        '[' => Some(']'),
        _ => None,
    }
}

/// Split masked SQL into words and punctuation with paren depth.
///
/// `"quoted"` and `[bracketed]` identifiers become one word. Only run this
/// on text whose literal contents are masked, or a quote character inside a
/// literal would swallow the code after it.
///
/// Unbalanced closing parens clamp at depth zero.
pub fn tokenize(text: &str) -> Vec<Lexeme<'_>> {
    lex(text, true)
}

/// Like [`tokenize`], but quote characters are plain punctuation.
pub fn tokenize_unquoted(text: &str) -> Vec<Lexeme<'_>> {
    lex(text, false)
}

fn lex(text: &str, quoted_idents: bool) -> Vec<Lexeme<'_>> {
    let mut lexemes = Vec::new();
    let mut depth = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }

        if is_word_char(c) {
            let mut end = start + c.len_utf8();
            while let Some(&(i, n)) = chars.peek() {
                if !is_word_char(n) {
                    break;
                }
                end = i + n.len_utf8();
                chars.next();
            }
            lexemes.push(Lexeme {
                kind: LexemeKind::Word(&text[start..end]),
                offset: start,
                depth,
            });
            continue;
        }

        if let Some(close) = closing_quote(c).filter(|_| quoted_idents) {
            let inner_start = start + 1;
            let mut inner_end = text.len();
            for (i, n) in chars.by_ref() {
                if n == close {
                    inner_end = i;
                    break;
                }
            }
            lexemes.push(Lexeme {
                kind: LexemeKind::Word(&text[inner_start..inner_end]),
                offset: start,
                depth,
            });
            continue;
        }

        if c == ')' {
            depth = depth.saturating_sub(1);
        }
        lexemes.push(Lexeme {
            kind: LexemeKind::Punct(c),
            offset: start,
            depth,
        });
        if c == '(' {
            depth += 1;
        }
    }

    lexemes
}
