use crate::common::file::{FileSpec, write_file};
use assert_cmd::Command;
use assert_fs::TempDir;
use rstest::fixture;
use std::path::Path;

pub const AUTHOR_DATE: &str = "2023-01-01 12:00:00 +0000";
pub const READABLE_AUTHOR_DATE: &str = "Sun Jan 1 12:00:00 2023 +0000";

#[fixture]
pub fn repository_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// A repository with `a.txt` committed as the root commit on `main`
#[fixture]
pub fn init_repository_dir(repository_dir: TempDir) -> TempDir {
    run_gitlet_command(repository_dir.path(), &["init"])
        .assert()
        .success();

    write_file(FileSpec::new(
        repository_dir.path().join("a.txt"),
        "one".to_string(),
    ));
    gitlet_add(repository_dir.path(), &["a.txt"]);
    gitlet_commit(repository_dir.path(), "Initial commit")
        .assert()
        .success();

    repository_dir
}

pub fn run_gitlet_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("gitlet").expect("Failed to find gitlet binary");
    cmd.envs(vec![
        ("NO_COLOR", "1"),
        ("GITLET_AUTHOR_NAME", "fake_user"),
        ("GITLET_AUTHOR_EMAIL", "fake_email@email.com"),
        ("GITLET_AUTHOR_DATE", AUTHOR_DATE), // %Y-%m-%d %H:%M:%S %z
    ]);
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn gitlet_commit(dir: &Path, message: &str) -> Command {
    run_gitlet_command(dir, &["commit", "-m", message])
}

pub fn gitlet_add(dir: &Path, paths: &[&str]) {
    let mut args = vec!["add"];
    args.extend_from_slice(paths);

    run_gitlet_command(dir, &args).assert().success();
}

/// Write a file, stage it and commit it in one go
pub fn commit_file(dir: &Path, file_name: &str, content: &str, message: &str) -> String {
    write_file(FileSpec::new(dir.join(file_name), content.to_string()));
    gitlet_add(dir, &[file_name]);
    gitlet_commit(dir, message).assert().success();

    get_head_commit_id(dir)
}

pub fn gitlet_checkout(dir: &Path, target: &str) {
    run_gitlet_command(dir, &["checkout", target])
        .assert()
        .success();
}

pub fn gitlet_merge(dir: &Path, branch: &str) -> Command {
    run_gitlet_command(dir, &["merge", branch])
}

pub fn stdout_of(mut cmd: Command) -> String {
    let output = cmd.output().expect("Failed to run gitlet");
    assert!(output.status.success(), "gitlet failed: {output:?}");

    String::from_utf8(output.stdout).expect("stdout is not UTF-8")
}

/// Get the commit HEAD resolves to
pub fn get_head_commit_id(dir: &Path) -> String {
    let metadata_dir = dir.join(".gitlet");
    let head_content = std::fs::read_to_string(metadata_dir.join("HEAD"))
        .expect("Failed to read HEAD");

    // HEAD holds either a commit id or a ref like "ref: refs/heads/main"
    match head_content.trim().strip_prefix("ref: ") {
        Some(ref_path) => std::fs::read_to_string(metadata_dir.join(ref_path))
            .expect("Failed to read branch ref")
            .trim()
            .to_string(),
        None => head_content.trim().to_string(),
    }
}

pub fn get_branch_commit_id(dir: &Path, branch: &str) -> Option<String> {
    std::fs::read_to_string(dir.join(".gitlet").join("refs").join("heads").join(branch))
        .ok()
        .map(|content| content.trim().to_string())
}
