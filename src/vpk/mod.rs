//! The VPK v2 backend: parsing, packing, and the [`Tree`](crate::tree::Tree) implementation over
//! the in-memory archive structure.

mod format;
pub mod pack;
pub mod parse;
mod tree;

pub use tree::{Dir, Ext, File, VpkEntry, VpkTree};

impl VpkTree {
    /// Parse a complete VPK v2 archive from bytes.
    pub fn parse(bytes: &[u8]) -> crate::error::Result<VpkTree> {
        parse::parse(bytes)
    }

    /// Serialize this tree to a VPK v2 archive. Equivalent to `Tree::pack`, exposed here so callers
    /// holding a concrete `VpkTree` (rather than `&dyn Tree`) don't need the trait in scope.
    pub fn to_bytes(&self) -> crate::error::Result<Vec<u8>> {
        pack::pack(self)
    }
}
