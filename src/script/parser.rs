//! Parsing tokenized lines into a [`Script`] of [`Command`]s.

use super::lexer::tokenize;
use crate::error::{Error, Result};
use crate::path;

/// `PACK_NAME:PATH`, or with an empty/`.`-cleaned path, a bare pack reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref {
    pub pack: String,
    /// Canonicalised path, used for every lookup/mutation against a tree.
    pub path: String,
    /// The path exactly as written, before cleaning -- `clone -e` uses this as regex source text,
    /// since path-cleaning a pattern like `".*\.txt"` would mangle its `.` components.
    pub raw_path: String,
    /// Whether the written path ended with `/`, decided before cleaning strips it. Used by `copy`'s
    /// rename-on-single-file-match special case.
    pub ends_with_slash: bool,
}

fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_ref(s: &str) -> Result<Ref> {
    let i = s.find(':').ok_or_else(|| Error::InvalidRef(s.to_string()))?;
    if i == 0 {
        return Err(Error::InvalidRef(s.to_string()));
    }
    let pack = &s[..i];
    if pack != "." && !is_valid_name(pack) {
        return Err(Error::InvalidRef(s.to_string()));
    }
    let raw_path = &s[i + 1..];
    Ok(Ref {
        pack: pack.to_string(),
        path: path::clean(raw_path),
        raw_path: raw_path.to_string(),
        ends_with_slash: raw_path.ends_with('/'),
    })
}

#[derive(Debug, Clone)]
pub enum Command {
    Bind { name: String, reference: Option<Ref> },
    Remove { reference: Ref },
    Copy { sources: Vec<Ref>, dest: Ref },
    Clone { regex: bool, sources: Vec<Ref>, dest: Ref },
}

#[derive(Debug, Clone)]
pub struct Script {
    pub commands: Vec<(usize, Command)>,
}

fn parse_line(cmd: &str, args: &[String]) -> Result<Command> {
    match cmd {
        "bind" => {
            if args.len() != 1 && args.len() != 2 {
                return Err(Error::IllegalArgumentCount("bind".to_string()));
            }
            let name = &args[0];
            if !is_valid_name(name) {
                return Err(Error::InvalidBindingName(name.clone()));
            }
            let reference = match args.get(1) {
                Some(r) => Some(parse_ref(r)?),
                None => None,
            };
            Ok(Command::Bind {
                name: name.clone(),
                reference,
            })
        }
        "remove" => {
            if args.len() != 1 {
                return Err(Error::IllegalArgumentCount("remove".to_string()));
            }
            Ok(Command::Remove {
                reference: parse_ref(&args[0])?,
            })
        }
        "copy" => {
            if args.len() < 2 {
                return Err(Error::IllegalArgumentCount("copy".to_string()));
            }
            let (srcs, dst) = args.split_at(args.len() - 1);
            let sources = srcs.iter().map(|s| parse_ref(s)).collect::<Result<Vec<_>>>()?;
            let dest = parse_ref(&dst[0])?;
            Ok(Command::Copy { sources, dest })
        }
        "clone" => {
            let mut idx = 0;
            let regex = match args.first().map(String::as_str) {
                Some("-e") => {
                    idx = 1;
                    true
                }
                Some(f) if f.starts_with('-') => return Err(Error::UnknownFlag(f.to_string())),
                _ => false,
            };
            if args.len() < idx + 2 {
                return Err(Error::IllegalArgumentCount("clone".to_string()));
            }
            let (srcs, dst) = args[idx..].split_at(args.len() - idx - 1);
            let sources = srcs.iter().map(|s| parse_ref(s)).collect::<Result<Vec<_>>>()?;
            let dest = parse_ref(&dst[0])?;
            if !dest.path.is_empty() {
                return Err(Error::InvalidRef(dst[0].clone()));
            }
            Ok(Command::Clone { regex, sources, dest })
        }
        other => Err(Error::UnknownCommand(other.to_string())),
    }
}

/// Parse a whole script. Source must be valid UTF-8 ([`Error::NotAScript`] otherwise). Every error
/// is wrapped with its 1-based source line number.
pub fn parse(source: &[u8]) -> Result<Script> {
    let text = std::str::from_utf8(source).map_err(|_| Error::NotAScript)?;
    let mut commands = Vec::new();
    for (i, raw_line) in text.lines().enumerate() {
        let line_no = i + 1;
        let tokens = tokenize(raw_line).map_err(|e| e.at_line(line_no))?;
        if tokens.is_empty() {
            continue;
        }
        let cmd = parse_line(&tokens[0], &tokens[1..]).map_err(|e| e.at_line(line_no))?;
        commands.push((line_no, cmd));
    }
    Ok(Script { commands })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bind_with_and_without_ref() {
        let s = parse(b"bind A\nbind B .:tmp\n").unwrap();
        assert_eq!(s.commands.len(), 2);
        match &s.commands[0].1 {
            Command::Bind { name, reference } => {
                assert_eq!(name, "A");
                assert!(reference.is_none());
            }
            _ => panic!("expected bind"),
        }
        match &s.commands[1].1 {
            Command::Bind { name, reference } => {
                assert_eq!(name, "B");
                assert_eq!(reference.as_ref().unwrap().pack, ".");
                assert_eq!(reference.as_ref().unwrap().path, "tmp");
            }
            _ => panic!("expected bind"),
        }
    }

    #[test]
    fn rejects_bad_binding_name() {
        assert!(parse(b"bind 1bad").is_err());
    }

    #[test]
    fn parses_copy_and_clone() {
        let s = parse(b"copy B:dir1/file12.txt A:dirX/f1.txt\nclone -e A:\".*\\.txt\" B:\n").unwrap();
        assert!(matches!(s.commands[0].1, Command::Copy { .. }));
        match &s.commands[1].1 {
            Command::Clone { regex, sources, dest } => {
                assert!(regex);
                assert_eq!(sources.len(), 1);
                assert_eq!(dest.pack, "B");
            }
            _ => panic!("expected clone"),
        }
    }

    #[test]
    fn clone_requires_bare_pack_destination() {
        assert!(parse(b"clone A: B:not_bare").is_err());
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let s = parse(b"\n# comment\nbind A\n").unwrap();
        assert_eq!(s.commands.len(), 1);
    }

    #[test]
    fn error_carries_line_number() {
        let err = parse(b"bind A\nbind\n").unwrap_err();
        match err {
            Error::AtLine { line, .. } => assert_eq!(line, 2),
            _ => panic!("expected AtLine"),
        }
    }
}
