//! Wire-level structs for the VPK v2 header and per-file directory entry, read with `binread` the
//! same way the upstream VPK parser reads `VPKHeader`/`VPKDirectoryEntry`.

use binread::BinRead;

pub const MAGIC: u32 = 0x55aa_1234;
pub const VERSION: u32 = 2;
pub const OTHER_MD5_SIZE: u32 = 48;
/// Marks a directory entry's data as stored inline in this file rather than in an external
/// archive chunk. This core only ever produces and accepts this value.
pub const INLINE_ARCHIVE_INDEX: u16 = 0x7fff;
pub const FILE_INFO_TERMINATOR: u16 = 0xffff;

pub const HEADER_LEN: usize = 28;
/// `MD5(tree) || MD5("") || MD5(everything before this section)`.
pub const CHECKSUM_SECTION_LEN: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct Header {
    pub magic: u32,
    pub version: u32,
    pub tree_size: u32,
    pub data_size: u32,
    pub arch_md5_size: u32,
    pub other_md5_size: u32,
    pub signature_size: u32,
}

/// The fixed-size tail of a file entry, immediately following its null-terminated name in the
/// tree section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct FileInfo {
    pub crc32: u32,
    pub preload_length: u16,
    pub archive_index: u16,
    pub archive_offset: u32,
    pub file_length: u32,
    pub terminator: u16,
}
