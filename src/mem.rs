//! Tree backend over a flat, insertion-ordered path -> bytes mapping.

use crate::error::{Error, Result};
use crate::path;
use crate::tree::{BoxEntry, Entry, FindItem, RemoveListener, Tree};
use indexmap::IndexMap;
use std::borrow::Cow;
use std::sync::Arc;

/// A file stored in a [`MemTree`]. Unlike the local backend, the bytes are owned outright -- there
/// is no backing file to re-read.
#[derive(Debug, Clone)]
pub struct MemEntry {
    path: String,
    data: Arc<[u8]>,
}

impl Entry for MemEntry {
    fn path(&self) -> &str {
        &self.path
    }

    fn data(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(&self.data))
    }

    fn size(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// An ephemeral, in-memory tree. Created empty by `bind NAME` (no ref) in the script interpreter;
/// never persisted.
#[derive(Debug, Default)]
pub struct MemTree {
    entries: IndexMap<String, MemEntry>,
}

impl MemTree {
    pub fn new() -> MemTree {
        MemTree::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Tree for MemTree {
    fn find(&self, query: &str) -> Box<dyn Iterator<Item = FindItem>> {
        let query = path::clean(query);
        if query.is_empty() {
            let items: Vec<FindItem> = self
                .entries
                .iter()
                .map(|(p, e)| (p.clone(), Box::new(e.clone()) as BoxEntry))
                .collect();
            return Box::new(items.into_iter());
        }

        if let Some(e) = self.entries.get(&query) {
            let e = e.clone();
            return Box::new(std::iter::once((".".to_string(), Box::new(e) as BoxEntry)));
        }

        let items: Vec<FindItem> = self
            .entries
            .iter()
            .filter(|(p, _)| path::has_dir_prefix(p, &query))
            .map(|(p, e)| (p[query.len() + 1..].to_string(), Box::new(e.clone()) as BoxEntry))
            .collect();
        Box::new(items.into_iter())
    }

    fn store(&mut self, path: &str, data: Vec<u8>) -> Result<BoxEntry> {
        let cleaned = path::clean(path);
        if cleaned.is_empty() {
            return Err(Error::InvalidPath(path.to_string()));
        }
        let entry = MemEntry {
            path: cleaned.clone(),
            data: Arc::from(data),
        };
        self.entries.insert(cleaned, entry.clone());
        Ok(Box::new(entry))
    }

    fn remove(&mut self, path: &str, mut listener: Option<&mut RemoveListener<'_>>) -> Result<()> {
        let query = path::clean(path);
        if query.is_empty() {
            if let Some(l) = listener.as_mut() {
                for p in self.entries.keys() {
                    l(p);
                }
            }
            self.entries.clear();
            return Ok(());
        }

        if self.entries.shift_remove(&query).is_some() {
            if let Some(l) = listener.as_mut() {
                l(&query);
            }
            return Ok(());
        }

        let doomed: Vec<String> = self
            .entries
            .keys()
            .filter(|p| path::has_dir_prefix(p, &query))
            .cloned()
            .collect();
        for p in doomed {
            self.entries.shift_remove(&p);
            if let Some(l) = listener.as_mut() {
                l(&p);
            }
        }
        Ok(())
    }

    fn put(&mut self, entry: &dyn Entry) -> Result<BoxEntry> {
        let data = entry.data()?.into_owned();
        self.store(entry.path(), data)
    }
}
