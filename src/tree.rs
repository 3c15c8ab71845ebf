//! The polymorphic `Tree`/`Entry` contract implemented identically (modulo the notes in each
//! backend module) by the local filesystem backend, the in-memory backend, and the VPK backend.

use crate::error::{Error, Result};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;

/// A handle to a file in some [`Tree`]. Entries are values: reading one does not keep the tree
/// borrowed, and an entry may outlive mutations made to the tree it came from.
pub trait Entry: fmt::Debug {
    /// The entry's path within its own tree, in canonical forward-slash form.
    fn path(&self) -> &str;
    /// The entry's bytes. May perform I/O (the local backend reads lazily on access).
    fn data(&self) -> Result<Cow<'_, [u8]>>;
    /// The entry's size in bytes. Default implementation reads the data; backends that can answer
    /// more cheaply (the VPK backend, stat-based implementations) should override it.
    fn size(&self) -> Result<u64> {
        Ok(self.data()?.len() as u64)
    }
    /// Narrow downcasting hook so `Tree::put` can recognise a same-backend entry (e.g. the VPK
    /// backend preserving a cached CRC) instead of always falling back to `store`.
    fn as_any(&self) -> &dyn Any;
}

/// A boxed, type-erased [`Entry`], used wherever code needs to pass entries between backends
/// (e.g. `copy`/`clone` in the script interpreter, or `put` accepting a foreign entry). Entries own
/// everything they need (owned strings, `Arc<[u8]>` data), so this carries no lifetime: a `find`
/// result can outlive the tree it came from, move between packs, or be stashed across a mutable
/// borrow of some other pack.
pub type BoxEntry = Box<dyn Entry>;

/// One `(relative_path, entry)` pair yielded by [`Tree::find`].
pub type FindItem = (String, BoxEntry);

/// A callback invoked once per file removed by [`Tree::remove`], given the file's path relative to
/// the tree's root in forward-slash form.
pub type RemoveListener<'a> = dyn FnMut(&str) + 'a;

/// Uniform operations over a collection of [`Entry`] values keyed by canonical path, implemented by
/// the local filesystem backend, the in-memory backend, and the VPK backend.
///
/// At most one entry exists per canonical path. See module docs on each backend for the exact
/// `find`/`remove` prefix semantics, which are shared verbatim across backends.
pub trait Tree {
    /// Enumerate entries matching `query`. See the crate-level docs for the exact-match,
    /// directory-prefix, and no-match rules. Restartable: calling `find` again yields a fresh
    /// sequence from the tree's current state; the result does not borrow the tree.
    fn find(&self, query: &str) -> Box<dyn Iterator<Item = FindItem>>;

    /// Store `data` under `path`, overwriting any existing entry there. Fails with
    /// [`Error::InvalidPath`] if `path` canonicalises to root.
    fn store(&mut self, path: &str, data: Vec<u8>) -> Result<BoxEntry>;

    /// Remove the exact file at `path`, or the whole subtree rooted at `path` if `path` is not
    /// itself a file. A root query empties the tree. `listener`, if given, is invoked once per
    /// removed file.
    fn remove(&mut self, path: &str, listener: Option<&mut RemoveListener<'_>>) -> Result<()>;

    /// Insert an existing entry, preserving its path. Same-backend-type sources may preserve extra
    /// metadata (e.g. a VPK entry's cached CRC); cross-backend sources fall back to `store`.
    fn put(&mut self, entry: &dyn Entry) -> Result<BoxEntry>;

    /// Serialize the whole tree to a single byte buffer. Only the VPK backend supports this.
    fn pack(&self) -> Result<Vec<u8>> {
        Err(Error::Unsupported)
    }
}
