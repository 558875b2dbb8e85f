//! Hand-written lexer for UniScript
//!
//! Produces the token vocabulary the parser driver walks: identifiers and
//! keywords (one class; the driver matches lexemes), integer and float
//! literals, double-quoted strings, and the operator/punctuation set.
//! Comments are consumed and never surface as tokens. Lexical faults carry
//! the position and length of the offending substring.

use crate::diagnostics::CompileError;
use crate::token::Token;

/// Two-character operators; comments are consumed before these match.
const MULTI_OPERATORS: [&str; 11] = [
    "**", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||",
];

const SINGLE_OPERATORS: &[u8] = b"+-*/%=<>&|^~!.,;:()[]{}";

/// Tokenize the whole source.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        // Comments
        if c == b'/' && pos + 1 < bytes.len() {
            match bytes[pos + 1] {
                b'/' => {
                    while pos < bytes.len() && bytes[pos] != b'\n' {
                        pos += 1;
                    }
                    continue;
                }
                b'*' => {
                    let start = pos;
                    pos += 2;
                    loop {
                        if pos + 1 >= bytes.len() {
                            return Err(CompileError::Lexical {
                                message: "Comentário de bloco não finalizado".to_string(),
                                position: start as i32,
                                length: (bytes.len() - start).max(1) as i32,
                            });
                        }
                        if bytes[pos] == b'*' && bytes[pos + 1] == b'/' {
                            pos += 2;
                            break;
                        }
                        pos += 1;
                    }
                    continue;
                }
                _ => {}
            }
        }

        // String literals (no escape processing; a newline does not close)
        if c == b'"' {
            let start = pos;
            pos += 1;
            while pos < bytes.len() && bytes[pos] != b'"' {
                pos += 1;
            }
            if pos >= bytes.len() {
                return Err(CompileError::Lexical {
                    message: "Constante string não finalizada".to_string(),
                    position: start as i32,
                    length: (bytes.len() - start).max(1) as i32,
                });
            }
            pos += 1;
            tokens.push(Token::new(&source[start..pos], start));
            continue;
        }

        // Identifiers and keywords
        if c.is_ascii_alphabetic() || c == b'_' {
            let start = pos;
            while pos < bytes.len()
                && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
            {
                pos += 1;
            }
            tokens.push(Token::new(&source[start..pos], start));
            continue;
        }

        // Numbers: digits, optionally one dot followed by digits
        if c.is_ascii_digit() {
            let start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos + 1 < bytes.len() && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit() {
                pos += 1;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
            tokens.push(Token::new(&source[start..pos], start));
            continue;
        }

        // Multi-character operators
        if pos + 1 < bytes.len() {
            let pair = &source[pos..pos + 2];
            if MULTI_OPERATORS.contains(&pair) {
                tokens.push(Token::new(pair, pos));
                pos += 2;
                continue;
            }
        }

        if SINGLE_OPERATORS.contains(&c) {
            tokens.push(Token::new(&source[pos..pos + 1], pos));
            pos += 1;
            continue;
        }

        return Err(CompileError::Lexical {
            message: format!("Caractere inválido: '{}'", source[pos..].chars().next().unwrap_or('?')),
            position: pos as i32,
            length: 1,
        });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexemes(source: &str) -> Vec<String> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.lexeme)
            .collect()
    }

    #[test]
    fn test_declaration_tokens() {
        assert_eq!(
            lexemes("var x: int = 1;"),
            ["var", "x", ":", "int", "=", "1", ";"]
        );
    }

    #[test]
    fn test_positions_round_trip() {
        let src = "var soma: float = 1.5 + 2;\nprint(soma);";
        for token in tokenize(src).unwrap() {
            assert_eq!(
                &src[token.position..token.position + token.lexeme.len()],
                token.lexeme
            );
        }
    }

    #[test]
    fn test_float_and_member_dot() {
        assert_eq!(lexemes("1.5"), ["1.5"]);
        assert_eq!(lexemes("1."), ["1", "."]);
        assert_eq!(lexemes("x.y"), ["x", ".", "y"]);
    }

    #[test]
    fn test_multi_char_operators() {
        assert_eq!(
            lexemes("a<<2>>1<=b>=c==d!=e&&f||g**2++ --"),
            [
                "a", "<<", "2", ">>", "1", "<=", "b", ">=", "c", "==", "d", "!=", "e", "&&",
                "f", "||", "g", "**", "2", "++", "--"
            ]
        );
    }

    #[test]
    fn test_string_literal_kept_whole() {
        assert_eq!(lexemes("print(\"Hello, World!\");"), [
            "print", "(", "\"Hello, World!\"", ")", ";"
        ]);
    }

    #[test]
    fn test_unclosed_string_reports_position() {
        let err = tokenize("var s: string = \"oops;").unwrap_err();
        assert_eq!(err.kind(), "lexical");
        assert!(err.message().contains("não finalizada"));
        assert_eq!(err.position(), 16);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            lexemes("var x: int = 1; // trailing\n/* block\ncomment */ x = 2;"),
            ["var", "x", ":", "int", "=", "1", ";", "x", "=", "2", ";"]
        );
    }

    #[test]
    fn test_unclosed_block_comment() {
        let err = tokenize("x = 1; /* never ends").unwrap_err();
        assert!(err.message().contains("Comentário"));
        assert_eq!(err.position(), 7);
    }

    #[test]
    fn test_unknown_character() {
        let err = tokenize("var x: int = @;").unwrap_err();
        assert!(err.message().contains("Caractere inválido"));
        assert_eq!(err.position(), 13);
    }
}
