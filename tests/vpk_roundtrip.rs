use packman::{Entry, Tree, VpkTree};

#[test]
fn round_trip_empty_archive() {
    let tree = VpkTree::new();
    let bytes = tree.pack().unwrap();
    assert_eq!(bytes.len(), 28 + 1 + 48);

    let parsed = VpkTree::parse(&bytes).unwrap();
    assert!(parsed.is_empty());

    // the three MD5s: tree (empty, just one NUL), empty string, everything-but-last-16-bytes
    let tree_md5 = &bytes[29..45];
    let empty_md5 = &bytes[45..61];
    assert_eq!(hex::encode(tree_md5), "93b885adfe0da089cdf634904fd59f71");
    assert_eq!(hex::encode(empty_md5), "d41d8cd98f00b204e9800998ecf8427e");
}

#[test]
fn round_trip_single_file() {
    let mut tree = VpkTree::new();
    tree.store("my/path/hello.test", b"Hello, World!".to_vec()).unwrap();

    let bytes = tree.pack().unwrap();
    let parsed = VpkTree::parse(&bytes).unwrap();

    let items: Vec<_> = parsed.find("my/path/hello.test").collect();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].0, ".");
    let data = items[0].1.data().unwrap();
    assert_eq!(&*data, b"Hello, World!");
    assert_eq!(crc32fast::hash(&data), 0xEC4A_C3D0);
}

#[test]
fn parsed_crc_matches_data() {
    let mut tree = VpkTree::new();
    tree.store("a.txt", b"one".to_vec()).unwrap();
    tree.store("b.md", b"two-two".to_vec()).unwrap();
    let parsed = VpkTree::parse(&tree.pack().unwrap()).unwrap();

    for e in parsed.iter() {
        let data = e.data().unwrap();
        assert_eq!(crc32fast::hash(&data), e.crc());
    }
}

#[test]
fn store_then_find_returns_same_bytes() {
    let mut tree = VpkTree::new();
    let entry = tree.store("dir/nested/file.bin", vec![9, 8, 7]).unwrap();
    assert_eq!(entry.path(), "dir/nested/file.bin");

    let items: Vec<_> = tree.find("dir/nested/file.bin").collect();
    assert_eq!(items.len(), 1);
    assert_eq!(&*items[0].1.data().unwrap(), &[9, 8, 7]);
}

#[test]
fn remove_clears_exact_and_prefix_matches() {
    let mut tree = VpkTree::new();
    tree.store("dir/a.txt", b"a".to_vec()).unwrap();
    tree.store("dir/b.txt", b"b".to_vec()).unwrap();
    tree.remove("dir/a.txt", None).unwrap();

    assert!(tree.find("dir/a.txt").next().is_none());
    let remaining: Vec<_> = tree.find("").map(|(p, _)| p).collect();
    assert!(!remaining.iter().any(|p| p == "dir/a.txt" || p.starts_with("dir/a.txt/")));
    assert_eq!(remaining, vec!["dir/b.txt".to_string()]);
}

#[test]
fn no_empty_extension_or_dir_survives_mutation() {
    let mut tree = VpkTree::new();
    tree.store("only/one.txt", b"x".to_vec()).unwrap();
    tree.remove("only/one.txt", None).unwrap();
    assert!(tree.is_empty());
}

#[test]
fn string_prefix_without_slash_boundary_is_not_a_match() {
    let mut tree = VpkTree::new();
    tree.store("dir1/file.txt", b"x".to_vec()).unwrap();
    assert!(tree.find("dir").next().is_none());
}

mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
