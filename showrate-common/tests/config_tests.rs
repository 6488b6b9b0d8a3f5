//! Tests for root folder resolution
//!
//! Note: Uses serial_test to prevent ENV variable race conditions. Tests
//! that manipulate SHOWRATE_ROOT are marked with #[serial] so they run
//! sequentially, not in parallel.

use serial_test::serial;
use showrate_common::config::{database_path, guest_id_path, resolve_root_folder};
use std::env;
use std::path::{Path, PathBuf};

#[test]
#[serial]
fn test_explicit_argument_has_highest_priority() {
    env::set_var("SHOWRATE_ROOT", "/tmp/showrate-env-root");

    let root = resolve_root_folder(Some(Path::new("/tmp/showrate-explicit-root")));
    assert_eq!(root, PathBuf::from("/tmp/showrate-explicit-root"));

    env::remove_var("SHOWRATE_ROOT");
}

#[test]
#[serial]
fn test_env_var_beats_default() {
    env::set_var("SHOWRATE_ROOT", "/tmp/showrate-env-root");

    let root = resolve_root_folder(None);
    assert_eq!(root, PathBuf::from("/tmp/showrate-env-root"));

    env::remove_var("SHOWRATE_ROOT");
}

#[test]
#[serial]
fn test_default_root_is_nonempty() {
    env::remove_var("SHOWRATE_ROOT");

    let root = resolve_root_folder(None);
    assert!(!root.as_os_str().is_empty());

    #[cfg(target_os = "linux")]
    {
        let path_str = root.to_string_lossy();
        assert!(path_str.contains("showrate"), "Linux default should end in showrate");
    }
}

#[test]
fn test_paths_join_under_root() {
    let root = PathBuf::from("/tmp/showrate-root");
    assert_eq!(database_path(&root), PathBuf::from("/tmp/showrate-root/showrate.db"));
    assert_eq!(guest_id_path(&root), PathBuf::from("/tmp/showrate-root/guest_id"));
}
