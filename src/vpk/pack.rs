//! Serializing a [`VpkTree`] back into a VPK v2 byte buffer.

use super::format::{
    CHECKSUM_SECTION_LEN, FILE_INFO_TERMINATOR, HEADER_LEN, INLINE_ARCHIVE_INDEX, MAGIC,
    OTHER_MD5_SIZE, VERSION,
};
use super::tree::VpkTree;
use crate::error::Result;
use md5::{Digest, Md5};

fn push_cstring(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

/// Serialize `tree` to a complete VPK v2 archive: header, tree section, inline data section, then
/// the three-MD5 checksum section. Any file whose cached CRC is `0` (freshly `store`d, never
/// packed) has its CRC computed here.
///
/// This is a two-pass encoder: the first pass measures the tree and data sections so the header's
/// size fields are known before anything is written; the second pass emits bytes.
pub fn pack(tree: &VpkTree) -> Result<Vec<u8>> {
    let mut tree_bytes = Vec::new();
    let mut data_bytes = Vec::new();

    for ext in &tree.exts {
        debug_assert!(!ext.dirs.is_empty(), "packed tree must not contain an empty extension");
        push_cstring(&mut tree_bytes, &ext.name);
        for dir in &ext.dirs {
            debug_assert!(!dir.entries.is_empty(), "packed tree must not contain an empty directory");
            push_cstring(&mut tree_bytes, &dir.path);
            for file in &dir.entries {
                push_cstring(&mut tree_bytes, &file.name);

                let crc = if file.crc == 0 && !file.data.is_empty() {
                    crc32fast::hash(&file.data)
                } else {
                    file.crc
                };
                let offset = data_bytes.len() as u32;
                let length = file.data.len() as u32;
                data_bytes.extend_from_slice(&file.data);

                tree_bytes.extend_from_slice(&crc.to_le_bytes());
                tree_bytes.extend_from_slice(&0u16.to_le_bytes()); // preload_length
                tree_bytes.extend_from_slice(&INLINE_ARCHIVE_INDEX.to_le_bytes());
                tree_bytes.extend_from_slice(&offset.to_le_bytes());
                tree_bytes.extend_from_slice(&length.to_le_bytes());
                tree_bytes.extend_from_slice(&FILE_INFO_TERMINATOR.to_le_bytes());
            }
            tree_bytes.push(0); // end of file list for this dir
        }
        tree_bytes.push(0); // end of dir list for this extension
    }
    tree_bytes.push(0); // end of extension list

    let tree_size = tree_bytes.len() as u32;
    let data_size = data_bytes.len() as u32;

    let mut out = Vec::with_capacity(HEADER_LEN + tree_bytes.len() + data_bytes.len() + CHECKSUM_SECTION_LEN);
    out.extend_from_slice(&MAGIC.to_le_bytes());
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&tree_size.to_le_bytes());
    out.extend_from_slice(&data_size.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // arch_md5_size
    out.extend_from_slice(&OTHER_MD5_SIZE.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // signature_size
    debug_assert_eq!(out.len(), HEADER_LEN);

    out.extend_from_slice(&tree_bytes);
    out.extend_from_slice(&data_bytes);

    let mut hasher = Md5::new();
    hasher.update(&tree_bytes);
    out.extend_from_slice(&hasher.finalize());

    let mut hasher = Md5::new();
    hasher.update(b"");
    out.extend_from_slice(&hasher.finalize());

    let mut hasher = Md5::new();
    hasher.update(&out);
    out.extend_from_slice(&hasher.finalize());

    debug_assert_eq!(out.len(), HEADER_LEN + tree_bytes.len() + data_bytes.len() + CHECKSUM_SECTION_LEN);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::parse::parse;
    use crate::tree::{Entry, Tree};

    #[test]
    fn empty_tree_packs_to_minimal_archive() {
        let t = VpkTree::new();
        let bytes = pack(&t).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 1 + CHECKSUM_SECTION_LEN);
        let parsed = parse(&bytes).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn packed_bytes_reparse_to_same_entries() {
        let mut t = VpkTree::new();
        t.store("readme.txt", b"hello".to_vec()).unwrap();
        t.store("nested/deep/file.bin", vec![1, 2, 3, 4]).unwrap();
        let bytes = pack(&t).unwrap();
        let parsed = parse(&bytes).unwrap();

        let items: Vec<_> = parsed.find("nested/deep/file.bin").collect();
        assert_eq!(items.len(), 1);
        assert_eq!(&*items[0].1.data().unwrap(), &[1, 2, 3, 4]);
    }
}
