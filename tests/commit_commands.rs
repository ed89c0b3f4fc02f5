use assert_fs::TempDir;
use predicates::prelude::*;
use rstest::rstest;

mod common;
use common::command::{
    gitlet_add, gitlet_commit, get_head_commit_id, init_repository_dir, repository_dir,
    run_gitlet_command,
};
use common::file::{FileSpec, count_objects, write_file, write_generated_files};

#[rstest]
fn root_commit_may_be_empty(repository_dir: TempDir) {
    let dir = repository_dir.path();
    run_gitlet_command(dir, &["init"]).assert().success();

    gitlet_commit(dir, "initial")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^\[main \(root-commit\) [0-9a-f]{7}\] initial\n$").unwrap());

    let head = get_head_commit_id(dir);
    run_gitlet_command(dir, &["cat-file", "-p", &head])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("tree "))
        .stdout(predicate::str::contains("parent").not());

    gitlet_commit(dir, "again")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No changes added to the commit."));
}

#[rstest]
fn blank_message_is_rejected(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("b.txt"), "two".to_string()));
    gitlet_add(dir, &["b.txt"]);

    gitlet_commit(dir, "   ")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Please enter a commit message."));
}

#[rstest]
fn commit_records_parent_and_reports_short_id(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    let parent = get_head_commit_id(dir);
    write_generated_files(dir, 3);
    gitlet_add(dir, &["."]);

    gitlet_commit(dir, "three more files")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^\[main [0-9a-f]{7}\] three more files\n$").unwrap());

    let head = get_head_commit_id(dir);
    assert_ne!(head, parent);
    run_gitlet_command(dir, &["cat-file", "-p", &head])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("parent {parent}")));
}

#[rstest]
fn unchanged_content_is_stored_once(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("copy.txt"), "one".to_string()));
    let objects_before = count_objects(dir);

    gitlet_add(dir, &["copy.txt"]);
    gitlet_add(dir, &["a.txt", "copy.txt"]);

    // "one" is already stored as the blob of a.txt
    assert_eq!(count_objects(dir), objects_before);
}

#[rstest]
fn missing_author_is_an_unexpected_failure(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("b.txt"), "two".to_string()));
    gitlet_add(dir, &["b.txt"]);

    gitlet_commit(dir, "no author")
        .env_remove("GITLET_AUTHOR_NAME")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("GITLET_AUTHOR_NAME not set"));
}
