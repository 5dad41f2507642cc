use std::error::Error;
use std::path::PathBuf;

use watchrun::watch::expand_paths;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn expands_directories_and_skips_ignored_ones() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();

    std::fs::create_dir_all(root.join("src/nested"))?;
    std::fs::create_dir_all(root.join(".git/objects"))?;
    std::fs::create_dir_all(root.join("target/debug"))?;
    std::fs::write(root.join("src/main.rs"), "")?;

    let expanded = expand_paths(&[root.to_path_buf()])?;

    assert!(expanded.contains(&root.to_path_buf()));
    assert!(expanded.contains(&root.join("src")));
    assert!(expanded.contains(&root.join("src/nested")));

    // Ignored directories are pruned along with their children; plain files
    // are not listed when a directory is expanded.
    assert!(!expanded.iter().any(|p| p.starts_with(root.join(".git"))));
    assert!(!expanded.iter().any(|p| p.starts_with(root.join("target"))));
    assert!(!expanded.contains(&root.join("src/main.rs")));

    Ok(())
}

#[test]
fn keeps_explicit_file_arguments() -> TestResult {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("build.log");
    std::fs::write(&file, "")?;

    let expanded = expand_paths(&[file.clone()])?;
    assert_eq!(expanded, vec![file]);

    Ok(())
}

#[test]
fn missing_paths_surface_an_error() {
    let missing = PathBuf::from("/definitely/not/here/watchrun");
    assert!(expand_paths(&[missing]).is_err());
}
