use std::fs;
use std::path::PathBuf;

use ev_tool::assert_project;

fn demos_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("demos")
}

#[test]
fn every_demo_matches_its_testcase() {
    let mut directories = fs::read_dir(demos_root())
        .expect("demos root must exist")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.join("testcase.json").is_file())
        .collect::<Vec<_>>();
    directories.sort();
    assert!(!directories.is_empty(), "expected demo testcases");

    for directory in directories {
        if let Err(error) = assert_project(&directory) {
            panic!("demo {} failed: {}", directory.display(), error);
        }
    }
}
