//! Line tokenizer: identifiers/unquoted runs plus double-quoted strings with escapes.

use crate::error::{Error, Result};

/// Split one script line into whitespace-separated tokens. A `#` outside quotes starts a comment
/// running to the end of the line. A double-quoted span may contain whitespace and `#` verbatim,
/// and recognises the escapes `\"`, `\\`, `\n`, `\t`, `\r`; any other escaped character is kept
/// literally (backslash and all). A quoted span that concatenates directly onto unquoted text (e.g.
/// `a"b"c`) joins into a single token.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_current = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '#' => break,
            ' ' | '\t' => {
                if has_current {
                    tokens.push(std::mem::take(&mut current));
                    has_current = false;
                }
            }
            '"' => {
                has_current = true;
                loop {
                    match chars.next() {
                        None => return Err(Error::UnterminatedString),
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('"') => current.push('"'),
                            Some('\\') => current.push('\\'),
                            Some('n') => current.push('\n'),
                            Some('t') => current.push('\t'),
                            Some('r') => current.push('\r'),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err(Error::UnterminatedString),
                        },
                        Some(c) => current.push(c),
                    }
                }
            }
            c => {
                has_current = true;
                current.push(c);
            }
        }
    }
    if has_current {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(tokenize("bind A .:tmp").unwrap(), vec!["bind", "A", ".:tmp"]);
    }

    #[test]
    fn strips_comments() {
        assert_eq!(tokenize("bind A .:tmp # comment").unwrap(), vec!["bind", "A", ".:tmp"]);
        assert_eq!(tokenize("# whole line comment").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn quoted_strings_keep_whitespace_and_hash() {
        assert_eq!(
            tokenize(r#"copy A:"a path/with space#not comment.txt" B:"#).unwrap(),
            vec!["copy", "A:a path/with space#not comment.txt", "B:"]
        );
    }

    #[test]
    fn escape_sequences() {
        assert_eq!(tokenize(r#""a\nb\tc\\d\"e""#).unwrap(), vec!["a\nb\tc\\d\"e"]);
    }

    #[test]
    fn quoted_concatenates_with_unquoted() {
        assert_eq!(tokenize(r#"a"b"c"#).unwrap(), vec!["abc"]);
    }

    #[test]
    fn unterminated_quote_errors() {
        assert!(tokenize(r#"bind A "unterminated"#).is_err());
    }
}
