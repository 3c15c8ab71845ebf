//! Executing a parsed [`Script`] against a map of named packs, and persisting modified VPK-backed
//! ones on completion.

use super::parser::{Command, Ref, Script};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::local::LocalTree;
use crate::mem::MemTree;
use crate::path;
use crate::tree::{Entry, Tree};
use crate::vpk::VpkTree;
use indexmap::IndexMap;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// A named, bound tree inside a running script.
struct Pack {
    tree: Box<dyn Tree>,
    /// Set only for VPK-backed packs: the file they're persisted to on completion.
    backing_path: Option<PathBuf>,
    modified: bool,
}

/// Runs a [`Script`] to completion. Bindings are looked up by name; `run` consumes the environment,
/// leaving nothing live afterward (packs are not reusable across runs).
pub struct Interpreter {
    packs: IndexMap<String, Pack>,
    config: Config,
}

fn native_path(cleaned: &str) -> PathBuf {
    if cleaned.is_empty() {
        return PathBuf::from(".");
    }
    cleaned.split('/').collect()
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Interpreter {
        Interpreter {
            packs: IndexMap::new(),
            config,
        }
    }

    /// Run every command in order, aborting on the first error. On success, persist modified
    /// VPK-backed packs in binding order.
    pub fn run(&mut self, script: &Script) -> Result<()> {
        for (line, cmd) in &script.commands {
            self.execute(cmd).map_err(|e| e.at_line(*line))?;
        }
        self.persist()
    }

    fn get(&self, name: &str) -> Result<&Pack> {
        self.packs.get(name).ok_or_else(|| Error::UnknownBinding(name.to_string()))
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut Pack> {
        self.packs
            .get_mut(name)
            .ok_or_else(|| Error::UnknownBinding(name.to_string()))
    }

    fn execute(&mut self, cmd: &Command) -> Result<()> {
        match cmd {
            Command::Bind { name, reference } => self.run_bind(name, reference.as_ref()),
            Command::Remove { reference } => self.run_remove(reference),
            Command::Copy { sources, dest } => self.run_copy(sources, dest),
            Command::Clone { regex, sources, dest } => self.run_clone(*regex, sources, dest),
        }
    }

    fn run_bind(&mut self, name: &str, reference: Option<&Ref>) -> Result<()> {
        let reference = match reference {
            None => {
                trace!(pack = name, "bound as empty in-memory tree");
                self.packs.insert(
                    name.to_string(),
                    Pack {
                        tree: Box::new(MemTree::new()),
                        backing_path: None,
                        modified: false,
                    },
                );
                return Ok(());
            }
            Some(r) => r,
        };

        if reference.pack != "." {
            if self.packs.contains_key(&reference.pack) {
                warn!(pack = name, aliased = %reference.pack, "binding to an existing pack is unsupported");
                return Err(Error::Unsupported);
            }
            return Err(Error::UnknownBinding(reference.pack.clone()));
        }

        let abs = native_path(&reference.path);
        let meta = fs::metadata(&abs);
        let exists = meta.is_ok();
        let is_dir = meta.as_ref().map(|m| m.is_dir()).unwrap_or(false);
        let is_vpk_ext = Path::new(&abs)
            .extension()
            .map(|e| e.eq_ignore_ascii_case("vpk"))
            .unwrap_or(false);

        if (!exists && !is_vpk_ext) || (exists && is_dir) {
            debug!(pack = name, path = %abs.display(), "binding as directory tree");
            let tree = LocalTree::with_config(&abs, self.config)?;
            self.packs.insert(
                name.to_string(),
                Pack {
                    tree: Box::new(tree),
                    backing_path: None,
                    modified: false,
                },
            );
            return Ok(());
        }

        let tree = if exists {
            let buf = fs::read(&abs).map_err(|e| Error::io(format!("reading {}", abs.display()), e))?;
            VpkTree::parse(&buf)?
        } else {
            VpkTree::new()
        };
        debug!(pack = name, path = %abs.display(), "binding as VPK");
        self.packs.insert(
            name.to_string(),
            Pack {
                tree: Box::new(tree),
                backing_path: Some(abs),
                modified: false,
            },
        );
        Ok(())
    }

    fn run_remove(&mut self, reference: &Ref) -> Result<()> {
        trace!(pack = %reference.pack, path = %reference.path, "remove");
        let pack = self.get_mut(&reference.pack)?;
        pack.tree.remove(&reference.path, None)?;
        pack.modified = true;
        Ok(())
    }

    fn run_copy(&mut self, sources: &[Ref], dest: &Ref) -> Result<()> {
        let mut items: Vec<(String, Vec<u8>)> = Vec::new();
        for s in sources {
            let src = self.get(&s.pack)?;
            for (rel, e) in src.tree.find(&s.path) {
                trace!(src_pack = %s.pack, src_path = e.path(), dst_pack = %dest.pack, "copy");
                items.push((rel, e.data()?.into_owned()));
            }
        }

        let rename = sources.len() == 1 && items.len() == 1 && items[0].0 == "." && !dest.ends_with_slash;
        let dst = self.get_mut(&dest.pack)?;
        if rename {
            let (_, data) = items.pop().expect("checked len == 1 above");
            dst.tree.store(&dest.path, data)?;
            dst.modified = true;
        } else {
            for (rel, data) in items {
                let d = if rel == "." {
                    dest.path.clone()
                } else {
                    path::join(&[dest.path.as_str(), rel.as_str()])
                };
                dst.tree.store(&d, data)?;
                dst.modified = true;
            }
        }
        Ok(())
    }

    fn run_clone(&mut self, use_regex: bool, sources: &[Ref], dest: &Ref) -> Result<()> {
        let mut entries: Vec<Box<dyn Entry>> = Vec::new();
        for s in sources {
            let src = self.get(&s.pack)?;
            if use_regex {
                let re = Regex::new(&s.raw_path).map_err(|_| Error::InvalidRef(s.raw_path.clone()))?;
                for (_, e) in src.tree.find("") {
                    if re.is_match(e.path()) {
                        trace!(src_pack = %s.pack, src_path = e.path(), dst_pack = %dest.pack, "clone (regex)");
                        entries.push(e);
                    }
                }
            } else {
                for (_, e) in src.tree.find(&s.path) {
                    trace!(src_pack = %s.pack, src_path = e.path(), dst_pack = %dest.pack, "clone");
                    entries.push(e);
                }
            }
        }

        let dst = self.get_mut(&dest.pack)?;
        for e in entries {
            dst.tree.put(e.as_ref())?;
            dst.modified = true;
        }
        Ok(())
    }

    fn persist(&mut self) -> Result<()> {
        for (name, pack) in self.packs.iter() {
            if !pack.modified {
                continue;
            }
            let path = match &pack.backing_path {
                Some(p) => p,
                None => continue,
            };
            let bytes = match pack.tree.pack() {
                Ok(b) => b,
                Err(Error::Unsupported) => continue,
                Err(e) => return Err(e),
            };
            if bytes_is_empty_vpk(&bytes) {
                trace!(pack = name, path = %path.display(), "deleting emptied VPK");
                match fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(Error::io(format!("removing {}", path.display()), e)),
                }
                continue;
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::io(format!("creating dir {}", parent.display()), e))?;
                let _ = crate::config::set_permissions(parent, self.config.dir_mode);
            }
            debug!(pack = name, path = %path.display(), bytes = bytes.len(), "persisting VPK");
            fs::write(path, &bytes).map_err(|e| Error::io(format!("writing {}", path.display()), e))?;
            let _ = crate::config::set_permissions(path, self.config.file_mode);
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Interpreter {
        Interpreter::new()
    }
}

/// A VPK archive with no extensions packs to exactly 77 bytes (header + single tree terminator +
/// checksums); this is cheaper than re-parsing the tree to count entries.
fn bytes_is_empty_vpk(bytes: &[u8]) -> bool {
    bytes.len() == 28 + 1 + 48
}
