//! Tree backend over an on-disk directory, scoped to an absolute root.

use crate::config::{set_permissions, Config};
use crate::error::{Error, Result};
use crate::path;
use crate::tree::{BoxEntry, Entry, FindItem, RemoveListener, Tree};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

/// A file inside a [`LocalTree`]. `data` is re-read from disk on every access (not cached), so
/// later filesystem changes made outside this tree are visible -- this is a documented contract,
/// not an oversight.
#[derive(Debug, Clone)]
pub struct LocalEntry {
    abs_path: PathBuf,
    rel_path: String,
}

impl Entry for LocalEntry {
    fn path(&self) -> &str {
        &self.rel_path
    }

    fn data(&self) -> Result<Cow<'_, [u8]>> {
        let bytes = fs::read(&self.abs_path)
            .map_err(|e| Error::io(format!("reading {}", self.abs_path.display()), e))?;
        Ok(Cow::Owned(bytes))
    }

    fn size(&self) -> Result<u64> {
        let meta = fs::metadata(&self.abs_path)
            .map_err(|e| Error::io(format!("stat {}", self.abs_path.display()), e))?;
        Ok(meta.len())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Tree over a directory on disk. All paths are resolved against `root` and rejected with
/// [`Error::InvalidPath`] if they would escape it.
pub struct LocalTree {
    root: PathBuf,
    config: Config,
}

impl LocalTree {
    /// Bind `dir` as the root of a local tree. The directory need not exist yet; it is created
    /// lazily by `store`.
    pub fn new(dir: impl AsRef<Path>) -> Result<LocalTree> {
        Self::with_config(dir, Config::default())
    }

    pub fn with_config(dir: impl AsRef<Path>, config: Config) -> Result<LocalTree> {
        let dir = dir.as_ref();
        let root = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| Error::io("resolving current directory", e))?
                .join(dir)
        };
        Ok(LocalTree {
            root: normalize_absolute(&root),
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a tree-relative query path to an absolute filesystem path, rejecting traversal
    /// above `root`.
    fn resolve(&self, query: &str) -> Result<PathBuf> {
        let mut stack: Vec<&str> = Vec::new();
        for comp in query.split('/') {
            match comp {
                "" | "." => continue,
                ".." => {
                    if stack.pop().is_none() {
                        return Err(Error::InvalidPath(query.to_string()));
                    }
                }
                c => stack.push(c),
            }
        }
        let mut abs = self.root.clone();
        for c in stack {
            abs.push(c);
        }
        Ok(abs)
    }

    fn rel_to_root(&self, abs: &Path) -> String {
        let rel = abs.strip_prefix(&self.root).unwrap_or(abs);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn entry_for(&self, abs: PathBuf) -> LocalEntry {
        let rel_path = self.rel_to_root(&abs);
        LocalEntry {
            abs_path: abs,
            rel_path,
        }
    }

    fn list(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::io(format!("reading dir {}", dir.display()), e)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(format!("reading dir {}", dir.display()), e))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| Error::io(format!("stat {}", path.display()), e))?;
            if file_type.is_dir() {
                self.list(&path, out)?;
            } else {
                out.push(path);
            }
        }
        Ok(())
    }
}

impl Tree for LocalTree {
    fn find(&self, query: &str) -> Box<dyn Iterator<Item = FindItem>> {
        let abs = match self.resolve(query) {
            Ok(a) => a,
            Err(_) => return Box::new(std::iter::empty()),
        };

        let meta = match fs::metadata(&abs) {
            Ok(m) => m,
            Err(_) => return Box::new(std::iter::empty()),
        };

        if meta.is_dir() {
            let mut files = Vec::new();
            if self.list(&abs, &mut files).is_err() {
                return Box::new(std::iter::empty());
            }
            let items: Vec<FindItem> = files
                .into_iter()
                .filter_map(|f| {
                    let rel = f.strip_prefix(&abs).ok()?;
                    let rel = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("/");
                    let entry = self.entry_for(f);
                    Some((rel, Box::new(entry) as BoxEntry))
                })
                .collect();
            Box::new(items.into_iter())
        } else {
            let entry = self.entry_for(abs);
            Box::new(std::iter::once((".".to_string(), Box::new(entry) as BoxEntry)))
        }
    }

    fn store(&mut self, path: &str, data: Vec<u8>) -> Result<BoxEntry> {
        let abs = self.resolve(path)?;
        if abs == self.root {
            return Err(Error::InvalidPath(path.to_string()));
        }
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("creating dir {}", parent.display()), e))?;
            let _ = set_permissions(parent, self.config.dir_mode);
        }
        fs::write(&abs, &data).map_err(|e| Error::io(format!("writing {}", abs.display()), e))?;
        let _ = set_permissions(&abs, self.config.file_mode);
        Ok(Box::new(self.entry_for(abs)))
    }

    fn remove(&mut self, path: &str, mut listener: Option<&mut RemoveListener<'_>>) -> Result<()> {
        let abs = self.resolve(path)?;
        if abs == self.root {
            // A root query empties the tree, but the bound root directory itself must survive --
            // `LocalTree` stays usable afterward, matching `MemTree`/`VpkTree` clearing their
            // backing collection rather than ceasing to exist.
            let entries = match fs::read_dir(&self.root) {
                Ok(e) => e,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(Error::io(format!("reading dir {}", self.root.display()), e)),
            };
            for entry in entries {
                let entry =
                    entry.map_err(|e| Error::io(format!("reading dir {}", self.root.display()), e))?;
                remove_recursive(&self.root, &entry.path(), listener.as_deref_mut())?;
            }
            return Ok(());
        }
        remove_recursive(&self.root, &abs, listener)
    }

    fn put(&mut self, entry: &dyn Entry) -> Result<BoxEntry> {
        let data = entry.data()?.into_owned();
        self.store(entry.path(), data)
    }
}

fn remove_recursive(
    root: &Path,
    abs: &Path,
    mut listener: Option<&mut RemoveListener<'_>>,
) -> Result<()> {
    let meta = match fs::metadata(abs) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io(format!("stat {}", abs.display()), e)),
    };

    if meta.is_dir() {
        let entries = fs::read_dir(abs)
            .map_err(|e| Error::io(format!("reading dir {}", abs.display()), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(format!("reading dir {}", abs.display()), e))?;
            remove_recursive(root, &entry.path(), listener.as_deref_mut())?;
        }
        fs::remove_dir(abs).map_err(|e| Error::io(format!("removing dir {}", abs.display()), e))
    } else {
        if let Some(l) = listener.as_mut() {
            let rel = abs
                .strip_prefix(root)
                .unwrap_or(abs)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            l(&rel);
        }
        fs::remove_file(abs).map_err(|e| Error::io(format!("removing {}", abs.display()), e))
    }
}

/// Manual `.`/`..` resolution for a path that may not exist on disk (so `fs::canonicalize` is not
/// an option). Assumes `p` is already absolute.
fn normalize_absolute(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in p.components() {
        use std::path::Component::*;
        match comp {
            CurDir => {}
            ParentDir => {
                out.pop();
            }
            c => out.push(c.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::clean;

    fn sorted_find(tree: &LocalTree, query: &str) -> Vec<String> {
        let mut v: Vec<String> = tree.find(query).map(|(p, _)| p).collect();
        v.sort();
        v
    }

    #[test]
    fn store_and_find_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = LocalTree::new(dir.path()).unwrap();
        tree.store("a/b/c.txt", b"hi".to_vec()).unwrap();

        let items: Vec<_> = tree.find("a/b/c.txt").collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].0, ".");
        assert_eq!(&*items[0].1.data().unwrap(), b"hi");
    }

    #[test]
    fn find_root_lists_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = LocalTree::new(dir.path()).unwrap();
        tree.store("file01.txt", b"file01".to_vec()).unwrap();
        tree.store("dir1/file11.txt", b"file11".to_vec()).unwrap();

        let mut all = sorted_find(&tree, "");
        all.sort();
        assert_eq!(all, vec!["dir1/file11.txt".to_string(), "file01.txt".to_string()]);
    }

    #[test]
    fn find_prefix_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = LocalTree::new(dir.path()).unwrap();
        tree.store("dir1/file.txt", b"x".to_vec()).unwrap();
        assert!(sorted_find(&tree, "dir").is_empty());
    }

    #[test]
    fn remove_cascade_and_listener() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = LocalTree::new(dir.path()).unwrap();
        tree.store("dir1/dir11/file111.md", b"file111".to_vec()).unwrap();
        tree.store("dir1/file11.txt", b"file11".to_vec()).unwrap();
        tree.store("dir2/file22.txt", b"file22".to_vec()).unwrap();

        let mut removed = Vec::new();
        tree.remove("dir1", Some(&mut |p: &str| removed.push(p.to_string())))
            .unwrap();
        removed.sort();
        assert_eq!(
            removed,
            vec!["dir1/dir11/file111.md".to_string(), "dir1/file11.txt".to_string()]
        );
        assert_eq!(sorted_find(&tree, ""), vec!["dir2/file22.txt".to_string()]);
    }

    /// The canonical seven-file fixture run through the exact two-step sequence from the Go
    /// original's `TestRemove`: remove one file individually, then remove its now-lighter parent
    /// directory, checking the listener sees only the files still present at that second call.
    #[test]
    fn remove_listener_order_after_prior_individual_removal() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = LocalTree::new(dir.path()).unwrap();
        tree.store("file01.txt", b"file01".to_vec()).unwrap();
        tree.store("file02.md", b"file02".to_vec()).unwrap();
        tree.store("dir1/dir11/file111.md", b"file111".to_vec()).unwrap();
        tree.store("dir1/dir12/file121.txt", b"file121".to_vec()).unwrap();
        tree.store("dir1/file11.txt", b"file11".to_vec()).unwrap();
        tree.store("dir1/file12.txt", b"file12".to_vec()).unwrap();
        tree.store("dir2/file22.txt", b"file22".to_vec()).unwrap();

        tree.remove("dir1/dir11/file111.md", None).unwrap();

        let mut removed = Vec::new();
        tree.remove("dir1", Some(&mut |p: &str| removed.push(p.to_string())))
            .unwrap();
        removed.sort();
        assert_eq!(removed, vec!["dir1/dir12/file121.txt", "dir1/file11.txt", "dir1/file12.txt"]);
    }

    #[test]
    fn remove_root_clears_children_but_keeps_root_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = LocalTree::new(dir.path()).unwrap();
        tree.store("dir1/file11.txt", b"file11".to_vec()).unwrap();
        tree.store("file01.txt", b"file01".to_vec()).unwrap();

        tree.remove("", None).unwrap();

        assert!(sorted_find(&tree, "").is_empty());
        assert!(dir.path().is_dir(), "bound root directory must survive a root-query remove");
    }

    #[test]
    fn rejects_escaping_root() {
        let dir = tempfile::tempdir().unwrap();
        let tree = LocalTree::new(dir.path()).unwrap();
        assert!(tree.resolve("../../etc/passwd").is_err());
        // a query that escapes via `..` but stays logically rooted once cleaned is fine
        assert_eq!(clean("a/../b"), "b");
    }
}
