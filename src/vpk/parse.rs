//! Parsing a VPK v2 byte buffer into a [`VpkTree`].

use super::format::{
    FileInfo, Header, CHECKSUM_SECTION_LEN, FILE_INFO_TERMINATOR, HEADER_LEN, INLINE_ARCHIVE_INDEX,
    MAGIC, OTHER_MD5_SIZE, VERSION,
};
use super::tree::{Dir, Ext, File, VpkTree};
use crate::error::{Error, Result};
use binread::BinReaderExt;
use md5::{Digest, Md5};
use std::io::Cursor;
use std::sync::Arc;

const MIN_LEN: usize = HEADER_LEN + CHECKSUM_SECTION_LEN;

/// Split off the next NUL-terminated string in `buf`, returning `(string, rest)`.
///
/// Unlike the original parser this rejects truncated input (no terminating NUL at all) instead of
/// silently treating it as an empty string -- a truncated tree should surface as
/// [`Error::FileCorrupted`], not be mistaken for a legitimate end-of-list marker.
fn read_cstring(buf: &[u8]) -> Result<(&str, &[u8])> {
    let i = memchr::memchr(0, buf).ok_or(Error::FileCorrupted)?;
    let s = std::str::from_utf8(&buf[..i]).map_err(|_| Error::FileCorrupted)?;
    Ok((s, &buf[i + 1..]))
}

fn read_file_info(buf: &[u8]) -> Result<(FileInfo, &[u8])> {
    const LEN: usize = 18;
    if buf.len() < LEN {
        return Err(Error::FileCorrupted);
    }
    let mut cursor = Cursor::new(&buf[..LEN]);
    let info: FileInfo = cursor.read_le().map_err(|_| Error::FileCorrupted)?;
    Ok((info, &buf[LEN..]))
}

/// Parse a complete VPK v2 archive (header, tree, inline data, checksums) into a [`VpkTree`].
///
/// Every file's bytes are copied out of `bytes` into an owned `Arc<[u8]>`; the tree does not borrow
/// from the input buffer, so `bytes` can be dropped immediately after this call returns.
pub fn parse(bytes: &[u8]) -> Result<VpkTree> {
    if bytes.len() < MIN_LEN {
        return Err(Error::FileCorrupted);
    }

    let mut cursor = Cursor::new(&bytes[..HEADER_LEN]);
    let header: Header = cursor.read_le().map_err(|_| Error::FileCorrupted)?;

    if header.magic != MAGIC {
        return Err(Error::NotVpk);
    }
    if header.version != VERSION {
        return Err(Error::UnsupportedVersion(header.version));
    }
    if header.arch_md5_size != 0 {
        return Err(Error::UnexpectedArchiveSection);
    }
    if header.other_md5_size != OTHER_MD5_SIZE {
        return Err(Error::InvalidChecksumSectionSize);
    }
    if header.signature_size != 0 {
        return Err(Error::UnexpectedSignature);
    }

    let tree_size = header.tree_size as usize;
    let data_size = header.data_size as usize;

    let rest = &bytes[HEADER_LEN..];
    if rest.len() < tree_size {
        return Err(Error::FileCorrupted);
    }
    let tree_bytes = &rest[..tree_size];
    let rest = &rest[tree_size..];
    if rest.len() < CHECKSUM_SECTION_LEN {
        return Err(Error::FileCorrupted);
    }
    let data_bytes = &rest[..rest.len() - CHECKSUM_SECTION_LEN];
    if data_bytes.len() != data_size {
        return Err(Error::InvalidDataSectionSize);
    }
    let checksums = &rest[rest.len() - CHECKSUM_SECTION_LEN..];

    let tree_md5 = &checksums[0..16];
    let empty_md5 = &checksums[16..32];
    let whole_md5 = &checksums[32..48];

    let mut hasher = Md5::new();
    hasher.update(tree_bytes);
    if hasher.finalize().as_slice() != tree_md5 {
        return Err(Error::FileCorrupted);
    }
    let mut hasher = Md5::new();
    hasher.update(b"");
    if hasher.finalize().as_slice() != empty_md5 {
        return Err(Error::FileCorrupted);
    }
    let mut hasher = Md5::new();
    hasher.update(&bytes[..bytes.len() - 16]);
    if hasher.finalize().as_slice() != whole_md5 {
        return Err(Error::FileCorrupted);
    }

    let tree = parse_tree(tree_bytes, data_bytes)?;
    Ok(tree)
}

fn parse_tree(mut tree: &[u8], data: &[u8]) -> Result<VpkTree> {
    let mut exts = Vec::new();
    loop {
        let (ext_name, rest) = read_cstring(tree)?;
        tree = rest;
        if ext_name.is_empty() {
            break;
        }
        let mut dirs = Vec::new();
        loop {
            let (dir_path, rest) = read_cstring(tree)?;
            tree = rest;
            if dir_path.is_empty() {
                break;
            }
            let mut entries = Vec::new();
            loop {
                let (file_name, rest) = read_cstring(tree)?;
                tree = rest;
                if file_name.is_empty() {
                    break;
                }
                let (info, rest) = read_file_info(tree)?;
                tree = rest;

                if info.preload_length != 0 {
                    return Err(Error::UnexpectedPreloaded);
                }
                if info.archive_index != INLINE_ARCHIVE_INDEX {
                    return Err(Error::FileCorrupted);
                }
                if info.terminator != FILE_INFO_TERMINATOR {
                    return Err(Error::FileCorrupted);
                }
                let offset = info.archive_offset as usize;
                let length = info.file_length as usize;
                let end = offset.checked_add(length).ok_or(Error::FileCorrupted)?;
                if end > data.len() {
                    return Err(Error::FileCorrupted);
                }
                let slice = &data[offset..end];
                if crc32fast::hash(slice) != info.crc32 {
                    return Err(Error::FileCorrupted);
                }
                entries.push(File {
                    name: file_name.to_string(),
                    data: Arc::from(slice),
                    crc: info.crc32,
                });
            }
            dirs.push(Dir {
                path: dir_path.to_string(),
                entries,
            });
        }
        exts.push(Ext {
            name: ext_name.to_string(),
            dirs,
        });
    }
    Ok(VpkTree { exts })
}

#[cfg(test)]
mod tests {
    use super::super::pack::pack;
    use super::*;
    use crate::tree::Entry;

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; MIN_LEN];
        assert!(matches!(parse(&bytes), Err(Error::NotVpk)));
    }

    #[test]
    fn rejects_short_input() {
        assert!(matches!(parse(&[0u8; 4]), Err(Error::FileCorrupted)));
    }

    #[test]
    fn roundtrips_through_pack() {
        let mut t = VpkTree::new();
        t.store("a/b.txt", b"hello world".to_vec()).unwrap();
        t.store("top.md", b"# hi".to_vec()).unwrap();
        let bytes = pack(&t).unwrap();
        let parsed = parse(&bytes).unwrap();
        let mut names: Vec<_> = parsed.iter().map(|e| e.path().to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["a/b.txt", "top.md"]);
    }
}
