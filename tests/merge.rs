use assert_fs::TempDir;
use predicates::prelude::*;
use rstest::rstest;

mod common;
use common::command::{
    commit_file, get_branch_commit_id, get_head_commit_id, gitlet_add, gitlet_checkout,
    gitlet_merge, init_repository_dir, run_gitlet_command, stdout_of,
};
use common::file::{FileSpec, count_objects, read_file, write_file};

/// History:
///       A (f = "A")
///      / \
///     B   C
///     |   |
///   main  feature
///
/// main sets f to "B", feature sets f to "C"
#[rstest]
fn diverging_edits_produce_conflict_markers(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    commit_file(dir, "f", "A", "add f");
    run_gitlet_command(dir, &["branch", "feature"]).assert().success();
    let ours = commit_file(dir, "f", "B", "main edits f");
    gitlet_checkout(dir, "feature");
    let theirs = commit_file(dir, "f", "C", "feature edits f");
    gitlet_checkout(dir, "main");

    gitlet_merge(dir, "feature")
        .assert()
        .success()
        .stdout(predicate::str::contains("Encountered a merge conflict."));

    assert_eq!(read_file(&dir.join("f")), "<<<<<<< HEAD\nB=======\nC>>>>>>>\n");

    let merge_commit = stdout_of(run_gitlet_command(dir, &["cat-file", "-p", &get_head_commit_id(dir)]));
    assert!(merge_commit.contains(&format!("parent {ours}\nparent {theirs}\n")));
    assert!(merge_commit.ends_with("Merged feature into main."));
}

#[rstest]
fn independent_changes_merge_cleanly(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    commit_file(dir, "shared.txt", "base", "base");
    run_gitlet_command(dir, &["branch", "feature"]).assert().success();
    commit_file(dir, "ours.txt", "ours", "main work");
    run_gitlet_command(dir, &["rm", "a.txt"]).assert().success();
    run_gitlet_command(dir, &["commit", "-m", "drop a"]).assert().success();
    gitlet_checkout(dir, "feature");
    commit_file(dir, "shared.txt", "changed by feature", "feature work");
    gitlet_checkout(dir, "main");

    gitlet_merge(dir, "feature")
        .assert()
        .success()
        .stdout(predicate::str::contains("Encountered a merge conflict.").not());

    assert_eq!(read_file(&dir.join("shared.txt")), "changed by feature");
    assert_eq!(read_file(&dir.join("ours.txt")), "ours");
    assert!(!dir.join("a.txt").exists());

    let log = stdout_of(run_gitlet_command(dir, &["log"]));
    assert!(log.starts_with("===\ncommit "));
    assert!(log.contains("\nMerge: "));
}

#[rstest]
fn merging_a_descendant_fast_forwards(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_gitlet_command(dir, &["branch", "ahead"]).assert().success();
    gitlet_checkout(dir, "ahead");
    let tip = commit_file(dir, "x.txt", "x", "ahead work");
    gitlet_checkout(dir, "main");
    let objects_before = count_objects(dir);

    gitlet_merge(dir, "ahead")
        .assert()
        .success()
        .stdout(predicate::str::contains("Current branch fast-forwarded."));

    assert_eq!(get_branch_commit_id(dir, "main"), Some(tip));
    assert_eq!(count_objects(dir), objects_before);
    assert_eq!(read_file(&dir.join("x.txt")), "x");
}

#[rstest]
fn merging_an_ancestor_is_a_no_op(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_gitlet_command(dir, &["branch", "behind"]).assert().success();
    let head = commit_file(dir, "x.txt", "x", "more work");

    gitlet_merge(dir, "behind")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Given branch is an ancestor of the current branch.",
        ));

    assert_eq!(get_head_commit_id(dir), head);
}

#[rstest]
fn merge_preconditions(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();

    gitlet_merge(dir, "main")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot merge a branch with itself."));
    gitlet_merge(dir, "missing")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "A branch with the name missing does not exist.",
        ));

    run_gitlet_command(dir, &["branch", "other"]).assert().success();
    gitlet_checkout(dir, "other");
    commit_file(dir, "o.txt", "o", "other work");
    gitlet_checkout(dir, "main");
    write_file(FileSpec::new(dir.join("p.txt"), "pending".to_string()));
    gitlet_add(dir, &["p.txt"]);

    gitlet_merge(dir, "other")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("You have uncommitted changes."));
}

#[rstest]
fn merge_refuses_to_clobber_untracked_files(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_gitlet_command(dir, &["branch", "other"]).assert().success();
    gitlet_checkout(dir, "other");
    commit_file(dir, "n.txt", "theirs", "other adds n");
    gitlet_checkout(dir, "main");
    let head = commit_file(dir, "m.txt", "m", "main adds m");
    write_file(FileSpec::new(dir.join("n.txt"), "mine".to_string()));
    let objects_before = count_objects(dir);

    gitlet_merge(dir, "other")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("untracked file in the way"));

    assert_eq!(get_head_commit_id(dir), head);
    assert_eq!(read_file(&dir.join("n.txt")), "mine");
    assert_eq!(count_objects(dir), objects_before);
}

#[rstest]
fn merge_refuses_unstaged_changes(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_gitlet_command(dir, &["branch", "dev"]).assert().success();
    gitlet_checkout(dir, "dev");
    commit_file(dir, "b.txt", "b", "dev adds b");
    gitlet_checkout(dir, "main");
    let head = get_head_commit_id(dir);
    write_file(FileSpec::new(dir.join("a.txt"), "LOCAL EDIT".to_string()));

    gitlet_merge(dir, "dev")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "There is a file with unstaged changes; delete it, or add and commit it first: a.txt",
        ));

    assert_eq!(get_head_commit_id(dir), head);
    assert_eq!(read_file(&dir.join("a.txt")), "LOCAL EDIT");
    assert!(!dir.join("b.txt").exists());
}

#[rstest]
fn merge_refuses_to_replace_untracked_file_with_directory(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_gitlet_command(dir, &["branch", "dev"]).assert().success();
    gitlet_checkout(dir, "dev");
    commit_file(dir, "d/f.txt", "f", "dev adds d/f.txt");
    gitlet_checkout(dir, "main");
    let head = commit_file(dir, "m.txt", "m", "main adds m");
    write_file(FileSpec::new(dir.join("d"), "precious untracked".to_string()));
    let objects_before = count_objects(dir);

    gitlet_merge(dir, "dev")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("untracked file in the way"));

    assert_eq!(get_head_commit_id(dir), head);
    assert_eq!(read_file(&dir.join("d")), "precious untracked");
    assert_eq!(count_objects(dir), objects_before);
}
