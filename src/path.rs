//! Forward-slash path utilities shared by every tree backend.
//!
//! Canonical form has no leading/trailing slash, no `.`/`..` components, and no backslashes. The
//! empty string, `"."`, and `"/"` all denote "root," which is represented internally as `""`.

/// Sentinel used in the VPK tree for "no extension" and "no directory". Load-bearing byte value of
/// the wire format: a single ASCII space.
pub const NO_EXTENSION: &str = " ";
pub const NO_DIR: &str = " ";

/// Normalize a path: forward slashes only, no `.`/`..` segments, no redundant separators. Returns
/// `""` for anything denoting root (`""`, `"."`, `"/"`, or a path that resolves up to root).
pub fn clean(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for comp in path.split('/') {
        match comp {
            "" | "." => continue,
            ".." => {
                out.pop();
            }
            c => out.push(c),
        }
    }
    out.join("/")
}

/// Split into `(dir, base)`. `dir` never has a trailing slash.
pub fn split(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    }
}

/// Split at the first `/`, returning `(head, tail)`. `tail` is `""` if there is no `/`.
pub fn split2(path: &str) -> (&str, &str) {
    match path.find('/') {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => (path, ""),
    }
}

/// Forward-slash join of path elements, skipping empty elements.
pub fn join(elems: &[&str]) -> String {
    elems
        .iter()
        .filter(|e| !e.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

/// Split a basename into `(stem, ext)`. `ext` is the rightmost run after a `.`; if there is no dot,
/// or the name ends with a dot, returns `(name, NO_EXTENSION)`.
pub fn split_ext(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if i > 0 && i + 1 < name.len() => (&name[..i], &name[i + 1..]),
        _ => (name, NO_EXTENSION),
    }
}

/// True if `prefix + "/"` is a strict prefix of `path` (the `/` boundary rule used throughout
/// `find`/`remove`).
pub fn has_dir_prefix(path: &str, prefix: &str) -> bool {
    path.len() > prefix.len() && path.starts_with(prefix) && path.as_bytes()[prefix.len()] == b'/'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_roots() {
        assert_eq!(clean(""), "");
        assert_eq!(clean("."), "");
        assert_eq!(clean("/"), "");
        assert_eq!(clean("./"), "");
        assert_eq!(clean("a/.."), "");
    }

    #[test]
    fn clean_normalizes() {
        assert_eq!(clean("/a/b/"), "a/b");
        assert_eq!(clean("a//b"), "a/b");
        assert_eq!(clean("a/./b"), "a/b");
        assert_eq!(clean("a/b/../c"), "a/c");
        assert_eq!(clean("../a"), "a");
    }

    #[test]
    fn split_basics() {
        assert_eq!(split("a/b/c.txt"), ("a/b", "c.txt"));
        assert_eq!(split("c.txt"), ("", "c.txt"));
        assert_eq!(split(""), ("", ""));
    }

    #[test]
    fn split2_basics() {
        assert_eq!(split2("a/b/c"), ("a", "b/c"));
        assert_eq!(split2("a"), ("a", ""));
    }

    #[test]
    fn split_ext_basics() {
        assert_eq!(split_ext("hello.test"), ("hello", "test"));
        assert_eq!(split_ext("noext"), ("noext", NO_EXTENSION));
        assert_eq!(split_ext("trailing."), ("trailing.", NO_EXTENSION));
        assert_eq!(split_ext(".hidden"), (".hidden", NO_EXTENSION));
        assert_eq!(split_ext("a.b.c"), ("a.b", "c"));
    }

    #[test]
    fn dir_prefix_boundary() {
        assert!(has_dir_prefix("dir1/file.txt", "dir1"));
        assert!(!has_dir_prefix("dir12/file.txt", "dir1"));
        assert!(!has_dir_prefix("dir1", "dir1"));
    }
}
