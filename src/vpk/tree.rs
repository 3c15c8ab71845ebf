//! The in-memory three-level VPK tree (extension -> directory -> file) and its [`Tree`]
//! implementation.

use crate::error::{Error, Result};
use crate::path::{self, NO_DIR, NO_EXTENSION};
use crate::tree::{BoxEntry, Entry, FindItem, RemoveListener, Tree};
use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;

/// One file: a basename (without extension), its bytes, and a cached CRC-32/IEEE. `crc == 0`
/// means "not yet computed" and is recomputed when the tree is packed.
#[derive(Debug, Clone)]
pub struct File {
    pub name: String,
    pub data: Arc<[u8]>,
    pub crc: u32,
}

/// All files sharing one directory path (the single-space sentinel [`NO_DIR`] means "no
/// directory," i.e. files at the tree's root).
#[derive(Debug, Clone, Default)]
pub struct Dir {
    pub path: String,
    pub entries: Vec<File>,
}

/// All (dir, file) pairs sharing one extension (the single-space sentinel [`NO_EXTENSION`] means
/// "no extension").
#[derive(Debug, Clone, Default)]
pub struct Ext {
    pub name: String,
    pub dirs: Vec<Dir>,
}

/// The parsed/constructed VPK tree: an ordered list of extensions, each an ordered list of
/// directories, each an ordered list of files. Order is significant -- it is exactly the byte
/// layout [`pack`](crate::vpk::pack) produces.
#[derive(Debug, Clone, Default)]
pub struct VpkTree {
    pub exts: Vec<Ext>,
}

fn build_name(name: &str, ext: &str) -> String {
    if ext == NO_EXTENSION {
        name.to_string()
    } else {
        format!("{}.{}", name, ext)
    }
}

pub(crate) fn build_path(dir: &str, name: &str, ext: &str) -> String {
    if dir.is_empty() || dir == NO_DIR {
        build_name(name, ext)
    } else {
        format!("{}/{}", dir, build_name(name, ext))
    }
}

/// An entry from a [`VpkTree`]: the (extension, directory, basename) triple identifying it, plus
/// its data and cached CRC.
#[derive(Debug, Clone)]
pub struct VpkEntry {
    pub(crate) ext: String,
    pub(crate) dir: String,
    pub(crate) name: String,
    pub(crate) data: Arc<[u8]>,
    pub(crate) crc: u32,
    full_path: String,
}

impl VpkEntry {
    fn new(ext: String, dir: String, name: String, data: Arc<[u8]>, crc: u32) -> VpkEntry {
        let full_path = build_path(&dir, &name, &ext);
        VpkEntry {
            ext,
            dir,
            name,
            data,
            crc,
            full_path,
        }
    }

    pub fn extension(&self) -> &str {
        &self.ext
    }

    pub fn directory(&self) -> &str {
        &self.dir
    }

    pub fn crc(&self) -> u32 {
        self.crc
    }
}

impl Entry for VpkEntry {
    fn path(&self) -> &str {
        &self.full_path
    }

    fn data(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(&self.data))
    }

    fn size(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl VpkTree {
    pub fn new() -> VpkTree {
        VpkTree::default()
    }

    pub fn is_empty(&self) -> bool {
        self.exts.is_empty()
    }

    /// Insert or overwrite the file identified by `(ext, dir, name)`, always mutating the live
    /// entry owned by the tree -- never a detached copy taken before a `Vec` push, which would
    /// silently discard the update (see DESIGN.md for the bug this guards against).
    fn put_raw(&mut self, ext: &str, dir: &str, name: &str, data: Arc<[u8]>, crc: u32) -> VpkEntry {
        let ext_idx = match self.exts.iter().position(|e| e.name == ext) {
            Some(i) => i,
            None => {
                self.exts.push(Ext {
                    name: ext.to_string(),
                    dirs: Vec::new(),
                });
                self.exts.len() - 1
            }
        };
        let dirs = &mut self.exts[ext_idx].dirs;
        let dir_idx = match dirs.iter().position(|d| d.path == dir) {
            Some(i) => i,
            None => {
                dirs.push(Dir {
                    path: dir.to_string(),
                    entries: Vec::new(),
                });
                dirs.len() - 1
            }
        };
        let entries = &mut dirs[dir_idx].entries;
        let file_idx = match entries.iter().position(|f| f.name == name) {
            Some(i) => {
                entries[i].data = data;
                entries[i].crc = crc;
                i
            }
            None => {
                entries.push(File {
                    name: name.to_string(),
                    data,
                    crc,
                });
                entries.len() - 1
            }
        };
        let f = &entries[file_idx];
        VpkEntry::new(ext.to_string(), dir.to_string(), f.name.clone(), f.data.clone(), f.crc)
    }

    /// Iterate every `(Entry, full_path)` in declared order -- the order `pack` preserves.
    pub fn iter(&self) -> impl Iterator<Item = VpkEntry> + '_ {
        self.exts.iter().flat_map(|ext| {
            ext.dirs.iter().flat_map(move |dir| {
                dir.entries.iter().map(move |f| {
                    VpkEntry::new(ext.name.clone(), dir.path.clone(), f.name.clone(), f.data.clone(), f.crc)
                })
            })
        })
    }
}

impl Tree for VpkTree {
    fn find(&self, query: &str) -> Box<dyn Iterator<Item = FindItem>> {
        let query = path::clean(query);
        if query.is_empty() {
            let items: Vec<FindItem> = self
                .iter()
                .map(|e| {
                    let p = e.path().to_string();
                    (p, Box::new(e) as BoxEntry)
                })
                .collect();
            return Box::new(items.into_iter());
        }

        let mut items: Vec<FindItem> = Vec::new();
        for ext in &self.exts {
            for dir in &ext.dirs {
                if dir.path == query {
                    for f in &dir.entries {
                        let e = VpkEntry::new(ext.name.clone(), dir.path.clone(), f.name.clone(), f.data.clone(), f.crc);
                        items.push((build_name(&f.name, &ext.name), Box::new(e)));
                    }
                    continue;
                }
                if path::has_dir_prefix(&dir.path, &query) {
                    let rel_dir = &dir.path[query.len() + 1..];
                    for f in &dir.entries {
                        let e = VpkEntry::new(ext.name.clone(), dir.path.clone(), f.name.clone(), f.data.clone(), f.crc);
                        items.push((build_path(rel_dir, &f.name, &ext.name), Box::new(e)));
                    }
                    continue;
                }
                if path::has_dir_prefix(&query, &dir.path) {
                    let remainder = &query[dir.path.len() + 1..];
                    let (stem, rem_ext) = path::split_ext(remainder);
                    if rem_ext != ext.name {
                        continue;
                    }
                    for f in &dir.entries {
                        if f.name == stem {
                            let e = VpkEntry::new(ext.name.clone(), dir.path.clone(), f.name.clone(), f.data.clone(), f.crc);
                            items.push((".".to_string(), Box::new(e)));
                        }
                    }
                }
            }
        }
        Box::new(items.into_iter())
    }

    fn store(&mut self, path: &str, data: Vec<u8>) -> Result<BoxEntry> {
        let cleaned = path::clean(path);
        if cleaned.is_empty() {
            return Err(Error::InvalidPath(path.to_string()));
        }
        let (dir, base) = path::split(&cleaned);
        let dir = if dir.is_empty() { NO_DIR } else { dir };
        let (stem, ext) = path::split_ext(base);
        let entry = self.put_raw(ext, dir, stem, Arc::from(data), 0);
        Ok(Box::new(entry))
    }

    fn remove(&mut self, path: &str, mut listener: Option<&mut RemoveListener<'_>>) -> Result<()> {
        let query = path::clean(path);
        if query.is_empty() {
            if let Some(l) = listener.as_mut() {
                for e in self.iter() {
                    l(e.path());
                }
            }
            self.exts.clear();
            return Ok(());
        }

        let mut kept_exts = Vec::with_capacity(self.exts.len());
        for mut ext in std::mem::take(&mut self.exts) {
            let mut kept_dirs = Vec::with_capacity(ext.dirs.len());
            for dir in std::mem::take(&mut ext.dirs) {
                if dir.path == query || path::has_dir_prefix(&dir.path, &query) {
                    if let Some(l) = listener.as_mut() {
                        for f in &dir.entries {
                            l(&build_path(&dir.path, &f.name, &ext.name));
                        }
                    }
                    continue;
                }
                if path::has_dir_prefix(&query, &dir.path) {
                    let remainder = &query[dir.path.len() + 1..];
                    let (stem, rem_ext) = path::split_ext(remainder);
                    if rem_ext == ext.name {
                        let mut dir = dir;
                        let path_clone = dir.path.clone();
                        let ext_name = ext.name.clone();
                        let mut removed = Vec::new();
                        dir.entries.retain(|f| {
                            if f.name == stem {
                                removed.push(build_path(&path_clone, &f.name, &ext_name));
                                false
                            } else {
                                true
                            }
                        });
                        if let Some(l) = listener.as_mut() {
                            for p in &removed {
                                l(p);
                            }
                        }
                        if dir.entries.is_empty() {
                            continue;
                        }
                        kept_dirs.push(dir);
                        continue;
                    }
                }
                kept_dirs.push(dir);
            }
            if kept_dirs.is_empty() {
                continue;
            }
            ext.dirs = kept_dirs;
            kept_exts.push(ext);
        }
        self.exts = kept_exts;
        Ok(())
    }

    fn put(&mut self, entry: &dyn Entry) -> Result<BoxEntry> {
        if let Some(v) = entry.as_any().downcast_ref::<VpkEntry>() {
            let e = self.put_raw(&v.ext, &v.dir, &v.name, v.data.clone(), v.crc);
            return Ok(Box::new(e));
        }
        let data = entry.data()?.into_owned();
        self.store(entry.path(), data)
    }

    fn pack(&self) -> Result<Vec<u8>> {
        crate::vpk::pack::pack(self)
    }
}
