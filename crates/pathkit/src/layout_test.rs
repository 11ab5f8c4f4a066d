// Copyright (c) Contributors to the pathkit project.
// SPDX-License-Identifier: Apache-2.0

use std::os::unix::fs::{FileTypeExt, PermissionsExt};

use rstest::rstest;
use tempfile::TempDir;

use super::*;
use crate::Error;

fn file_mode(path: &Path) -> u32 {
    std::fs::symlink_metadata(path).unwrap().permissions().mode() & 0o777
}

#[rstest]
fn test_parse_minimal_layout() {
    let layout = Layout::from_yaml("api: pathkit/v0\n").unwrap();
    assert_eq!(layout.api, LayoutApiVersion::V0);
    assert_eq!(layout.mode, "rwx");
    assert!(layout.nodes.is_empty());
    assert!(layout.source_path.is_none());
}

#[rstest]
fn test_parse_nested_nodes() {
    let yaml = r#"
api: pathkit/v0
mode: rx
prefix: fixture-
nodes:
  - name: config
    type: d
    mode: rwx
    children:
      - name: settings.yaml
        contents: "debug: true"
  - prefix: scratch-
    type: fifo
"#;
    let layout = Layout::from_yaml(yaml).unwrap();
    assert_eq!(layout.mode, "rx");
    assert_eq!(layout.prefix, "fixture-");
    assert_eq!(layout.nodes.len(), 2);

    let config = &layout.nodes[0];
    assert_eq!(config.node_type, NodeType::Dir);
    assert_eq!(config.children[0].node_type, NodeType::File);
    assert_eq!(
        config.children[0].contents.as_deref(),
        Some("debug: true")
    );
    assert_eq!(layout.nodes[1].node_type, NodeType::Fifo);
    assert!(layout.nodes[1].name.is_none());
}

#[rstest]
#[case("api: pathkit/v9\n")]
#[case("nodes: []\n")]
#[case("api: pathkit/v0\nnodes:\n  - type: socket\n")]
#[case("api: [unclosed\n")]
fn test_invalid_layouts(#[case] yaml: &str) {
    assert!(matches!(
        Layout::from_yaml(yaml),
        Err(Error::InvalidYaml { .. })
    ));
}

#[rstest]
fn test_load_records_source_and_resolves_base_dir() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir(tmp.path().join("roots")).unwrap();
    let file = tmp.path().join("fixture.yaml");
    std::fs::write(&file, "api: pathkit/v0\nbase_dir: roots\n").unwrap();

    let layout = Layout::load(&file).unwrap();
    assert_eq!(layout.source_path.as_deref(), Some(file.as_path()));
    assert_eq!(
        layout.base_dir.unwrap(),
        dunce::canonicalize(tmp.path().join("roots")).unwrap()
    );
}

#[rstest]
fn test_load_missing_file() {
    let tmp = TempDir::new().unwrap();
    assert!(matches!(
        Layout::load(tmp.path().join("missing.yaml")),
        Err(Error::ReadFailed { .. })
    ));
}

#[rstest]
fn test_build_tree_from_layout() {
    let base = TempDir::new().unwrap();
    let yaml = format!(
        r#"
api: pathkit/v0
mode: rx
prefix: fixture-
base_dir: {}
nodes:
  - name: config
    type: dir
    mode: rx
    children:
      - name: settings.yaml
        contents: "debug: true"
  - name: pipe
    type: fifo
    mode: rw
  - prefix: data-
    suffix: .txt
"#,
        base.path().display()
    );
    let layout = Layout::from_yaml(yaml).unwrap();
    let mut tree = TempTree::from_layout(&layout).unwrap();

    let root = tree.path().to_path_buf();
    assert!(root.starts_with(base.path()));
    assert!(
        root.file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("fixture-")
    );
    assert_eq!(file_mode(&root), 0o500);
    assert_eq!(tree.len(), 4);

    let settings = tree.get("config/settings.yaml").unwrap();
    assert_eq!(settings.get_mode(), Some("rx"));
    assert_eq!(file_mode(&root.join("config")), 0o500);
    assert_eq!(
        std::fs::read_to_string(root.join("config/settings.yaml")).unwrap(),
        "debug: true"
    );
    assert!(
        std::fs::symlink_metadata(root.join("pipe"))
            .unwrap()
            .file_type()
            .is_fifo()
    );

    let data = crate::find(&root, "data-", crate::FindTypes::Files, false).unwrap();
    assert_eq!(data.len(), 1);
    assert!(tree.contains(&data[0]));

    let config = tree.id_of("config").unwrap();
    tree.set_access(config, Some("rwx")).unwrap();
    tree.close().unwrap();
    assert!(!root.exists());
}

#[rstest]
fn test_layout_errors_leave_nothing_behind() {
    let base = TempDir::new().unwrap();
    let layout = Layout {
        base_dir: Some(base.path().to_path_buf()),
        nodes: vec![LayoutNode {
            name: Some("plain".to_string()),
            children: vec![LayoutNode::default()],
            ..Default::default()
        }],
        ..Layout::from_yaml("api: pathkit/v0").unwrap()
    };

    assert!(matches!(
        TempTree::from_layout(&layout),
        Err(Error::WrongType {
            expected: NodeType::Dir,
            ..
        })
    ));
    assert!(std::fs::read_dir(base.path()).unwrap().next().is_none());
}

#[rstest]
fn test_contents_on_dir_is_rejected() {
    let layout = Layout::from_yaml(
        "api: pathkit/v0\nnodes:\n  - name: d\n    type: dir\n    contents: nope\n",
    )
    .unwrap();
    assert!(matches!(
        TempTree::from_layout(&layout),
        Err(Error::ContentsForNonFile(NodeType::Dir))
    ));
}
