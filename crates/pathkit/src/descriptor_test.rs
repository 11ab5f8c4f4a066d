// Copyright (c) Contributors to the pathkit project.
// SPDX-License-Identifier: Apache-2.0

use std::os::unix::fs::{FileTypeExt, PermissionsExt};

use rstest::rstest;
use tempfile::TempDir;

use super::*;

#[rstest]
#[case("f", NodeType::File)]
#[case("file", NodeType::File)]
#[case("d", NodeType::Dir)]
#[case("dir", NodeType::Dir)]
#[case("fifo", NodeType::Fifo)]
fn test_parse_node_type(#[case] input: &str, #[case] expected: NodeType) {
    assert_eq!(input.parse::<NodeType>().unwrap(), expected);
}

#[rstest]
fn test_parse_unknown_node_type() {
    assert!(matches!(
        "socket".parse::<NodeType>(),
        Err(Error::InvalidNodeType(_))
    ));
}

#[rstest]
fn test_node_type_yaml_aliases() {
    let types: Vec<NodeType> = serde_yaml::from_str("[f, file, d, dir, fifo]").unwrap();
    assert_eq!(
        types,
        vec![
            NodeType::File,
            NodeType::File,
            NodeType::Dir,
            NodeType::Dir,
            NodeType::Fifo
        ]
    );
}

#[rstest]
#[case(NodeType::Dir)]
#[case(NodeType::Fifo)]
fn test_contents_only_for_files(#[case] node_type: NodeType) {
    match PathDescriptor::new(node_type).contents("hello") {
        Err(Error::ContentsForNonFile(t)) => assert_eq!(t, node_type),
        other => panic!("Expected ContentsForNonFile, got: {:?}", other),
    }
}

#[rstest]
fn test_paths_unavailable_before_attach() {
    let desc = PathDescriptor::file().name("a.txt");
    assert!(matches!(desc.relative_path(), Err(Error::Usage(_))));
    assert!(matches!(desc.absolute_path(), Err(Error::Usage(_))));
    assert!(!desc.exists());
}

#[rstest]
fn test_set_access_before_attach_is_usage_error() {
    let mut desc = PathDescriptor::file().name("a.txt").mode("r");
    assert!(matches!(desc.set_access(None), Err(Error::Usage(_))));
}

#[rstest]
fn test_attach_adopts_default_mode() {
    let mut desc = PathDescriptor::file().name("a.txt");
    desc.attach(Path::new("/tmp/root"), "rw", None).unwrap();
    assert_eq!(desc.get_mode(), Some("rw"));

    let mut explicit = PathDescriptor::file().name("b.txt").mode("r");
    explicit.attach(Path::new("/tmp/root"), "rw", None).unwrap();
    assert_eq!(explicit.get_mode(), Some("r"));
}

#[rstest]
fn test_attach_to_second_root_fails() {
    let mut desc = PathDescriptor::file().name("a.txt");
    desc.attach(Path::new("/tmp/one"), "rw", None).unwrap();
    assert!(matches!(
        desc.attach(Path::new("/tmp/two"), "rw", None),
        Err(Error::Usage(_))
    ));
}

#[rstest]
fn test_paths_are_derived_and_memoized() {
    let mut desc = PathDescriptor::file().name("a.txt");
    desc.attach(Path::new("/tmp/root"), "rw", Some(Path::new("sub")))
        .unwrap();

    let first = desc.absolute_path().unwrap();
    assert_eq!(first, Path::new("/tmp/root/sub/a.txt"));
    assert_eq!(desc.relative_path().unwrap(), Path::new("sub/a.txt"));
    // same allocation on every call
    assert!(std::ptr::eq(first, desc.absolute_path().unwrap()));
}

#[rstest]
fn test_materialize_file_with_contents() {
    let tmp = TempDir::new().unwrap();
    let mut desc = PathDescriptor::file()
        .name("a.txt")
        .contents("hello")
        .unwrap();
    desc.attach(tmp.path(), "rw", None).unwrap();
    desc.materialize().unwrap();

    assert!(desc.exists());
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("a.txt")).unwrap(),
        "hello"
    );
}

#[rstest]
fn test_materialize_empty_file_and_dir() {
    let tmp = TempDir::new().unwrap();
    let mut file = PathDescriptor::file().name("empty");
    file.attach(tmp.path(), "rw", None).unwrap();
    file.materialize().unwrap();
    assert_eq!(std::fs::read(tmp.path().join("empty")).unwrap(), b"");

    let mut dir = PathDescriptor::dir().name("sub");
    dir.attach(tmp.path(), "rwx", None).unwrap();
    dir.materialize().unwrap();
    assert!(tmp.path().join("sub").is_dir());
}

#[rstest]
fn test_materialize_fifo() {
    let tmp = TempDir::new().unwrap();
    let mut desc = PathDescriptor::fifo().name("pipe");
    desc.attach(tmp.path(), "rw", None).unwrap();
    desc.materialize().unwrap();

    let meta = std::fs::symlink_metadata(tmp.path().join("pipe")).unwrap();
    assert!(meta.file_type().is_fifo());
}

#[rstest]
fn test_materialize_twice_is_usage_error() {
    let tmp = TempDir::new().unwrap();
    let mut desc = PathDescriptor::dir().name("sub");
    desc.attach(tmp.path(), "rwx", None).unwrap();
    desc.materialize().unwrap();
    assert!(matches!(desc.materialize(), Err(Error::Usage(_))));
}

#[rstest]
fn test_materialize_without_parent_dir_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let mut desc = PathDescriptor::file().name("a.txt");
    desc.attach(tmp.path(), "rw", Some(Path::new("missing")))
        .unwrap();
    match desc.materialize() {
        Err(Error::NotFound(path)) => assert_eq!(path, tmp.path().join("missing")),
        other => panic!("Expected NotFound, got: {:?}", other),
    }
}

#[rstest]
fn test_set_access_overrides_mode() {
    let tmp = TempDir::new().unwrap();
    let mut desc = PathDescriptor::file().name("a.txt");
    desc.attach(tmp.path(), "rw", None).unwrap();
    desc.materialize().unwrap();

    desc.set_access(Some("r")).unwrap();
    assert_eq!(desc.get_mode(), Some("r"));
    let mode = std::fs::metadata(tmp.path().join("a.txt"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o400);
}

#[rstest]
fn test_set_access_keeps_mode_when_new_one_is_invalid() {
    let tmp = TempDir::new().unwrap();
    let mut desc = PathDescriptor::file().name("a.txt");
    desc.attach(tmp.path(), "rw", None).unwrap();
    desc.materialize().unwrap();

    assert!(matches!(
        desc.set_access(Some("rq")),
        Err(Error::InvalidModeChar('q'))
    ));
    assert_eq!(desc.get_mode(), Some("rw"));
}

#[rstest]
#[case(PathDescriptor::file().name("../escaped.txt"))]
#[case(PathDescriptor::file().name("/tmp/absolute.txt"))]
#[case(PathDescriptor::file().name("sub/a.txt"))]
#[case(PathDescriptor::file().name(""))]
#[case(PathDescriptor::dir().name(".."))]
#[case(PathDescriptor::dir().name("."))]
#[case(PathDescriptor::file().prefix("../"))]
#[case(PathDescriptor::file().suffix("/x"))]
fn test_validate_rejects_names_leaving_parent(#[case] desc: PathDescriptor) {
    assert!(matches!(desc.validate(), Err(Error::InvalidName(_))));
}

#[rstest]
fn test_validate_checks_mode() {
    assert!(matches!(
        PathDescriptor::file().name("a").mode("rq").validate(),
        Err(Error::InvalidModeChar('q'))
    ));
    PathDescriptor::file()
        .name("..hidden")
        .prefix("pre-")
        .suffix(".txt")
        .mode("rwa")
        .validate()
        .unwrap();
}

#[rstest]
#[case(PathDescriptor::file().contents("abc").unwrap())]
#[case(PathDescriptor::dir())]
#[case(PathDescriptor::fifo())]
fn test_materialize_unnamed_generates_name(#[case] desc: PathDescriptor) {
    let tmp = TempDir::new().unwrap();
    let mut desc = desc.prefix("pre-").suffix(".end");
    desc.attach(tmp.path(), "rwx", None).unwrap();
    desc.materialize().unwrap();

    let name = desc.get_name().unwrap().to_string();
    assert!(name.starts_with("pre-"));
    assert!(name.ends_with(".end"));
    assert_eq!(name.len(), "pre-".len() + NAME_RANDOM_LEN + ".end".len());
    assert_eq!(desc.absolute_path().unwrap(), tmp.path().join(&name));

    let meta = std::fs::symlink_metadata(tmp.path().join(&name)).unwrap();
    match desc.node_type() {
        NodeType::File => assert_eq!(std::fs::read(tmp.path().join(&name)).unwrap(), b"abc"),
        NodeType::Dir => assert!(meta.is_dir()),
        NodeType::Fifo => assert!(meta.file_type().is_fifo()),
    }
}

#[rstest]
fn test_materialize_unnamed_without_parent_dir_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let mut desc = PathDescriptor::file();
    desc.attach(tmp.path(), "rw", Some(Path::new("missing")))
        .unwrap();
    match desc.materialize() {
        Err(Error::NotFound(path)) => assert_eq!(path, tmp.path().join("missing")),
        other => panic!("Expected NotFound, got: {:?}", other),
    }
    assert!(desc.get_name().is_none());
}

#[rstest]
fn test_materialize_does_not_overwrite_existing_file() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("taken"), "original").unwrap();

    let mut desc = PathDescriptor::file().name("taken").contents("new").unwrap();
    desc.attach(tmp.path(), "rw", None).unwrap();
    assert!(matches!(
        desc.materialize(),
        Err(Error::CreateFailed { .. })
    ));
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("taken")).unwrap(),
        "original"
    );
}
