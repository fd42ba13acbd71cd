mod common;

use common::{FailOn, Scripted, entries, fixture};
use editor_undo::{CommandGroup, CommandHistory, IllegalState};
use pretty_assertions::assert_eq;
use std::panic::{AssertUnwindSafe, catch_unwind};

#[test]
fn test_third_of_five_children_fails() {
    let (_board, journal) = fixture();
    let mut history = CommandHistory::new();
    history.begin_group("Route Bus").unwrap();

    history.append_to_group(Scripted::ok(&journal, "c1")).unwrap();
    history.append_to_group(Scripted::ok(&journal, "c2")).unwrap();
    let err = history
        .append_to_group(Scripted::failing(&journal, "c3", FailOn::Execute))
        .unwrap_err();
    assert!(err.is_edit_failed());
    assert_eq!(
        entries(&journal),
        ["exec c1", "exec c2", "fail exec c3", "undo c2", "undo c1"]
    );

    // The group stays open until the caller ends it, but takes no more children.
    assert!(history.is_group_open());
    let refused = history
        .append_to_group(Scripted::ok(&journal, "c4"))
        .unwrap_err();
    assert_eq!(refused.illegal_state(), Some(IllegalState::GroupRolledBack));

    history.abort_group().unwrap();
    assert!(history.is_empty());
    assert!(history.is_clean());
    assert_eq!(entries(&journal).len(), 5);

    history.begin_group("Retry").unwrap();
    assert!(history.is_group_open());
}

#[test]
fn test_commit_after_failed_child_commits_nothing() {
    let (_board, journal) = fixture();
    let mut history = CommandHistory::new();
    history.begin_group("Pour Copper").unwrap();
    history.append_to_group(Scripted::ok(&journal, "zone")).unwrap();
    let _ = history.append_to_group(Scripted::failing(&journal, "thermal", FailOn::Execute));

    assert!(!history.commit_group().unwrap());
    assert!(history.is_empty());
    assert_eq!(
        entries(&journal),
        ["exec zone", "fail exec thermal", "undo zone"]
    );
}

#[test]
fn test_committed_group_undoes_and_redoes_as_unit() {
    let (_board, journal) = fixture();
    let mut history = CommandHistory::new();
    history.begin_group("Align").unwrap();
    for name in ["a", "b", "c"] {
        assert!(history.append_to_group(Scripted::ok(&journal, name)).unwrap());
    }
    assert_eq!(history.open_group_len(), Some(3));
    assert!(history.commit_group().unwrap());
    assert_eq!(history.len(), 1);
    assert_eq!(history.undo_label(), Some("Align"));

    history.undo().unwrap();
    history.redo().unwrap();
    assert_eq!(
        entries(&journal),
        [
            "exec a", "exec b", "exec c", "undo c", "undo b", "undo a", "redo a", "redo b",
            "redo c"
        ]
    );
}

#[test]
fn test_noop_child_is_not_kept() {
    let (_board, journal) = fixture();
    let mut history = CommandHistory::new();
    history.begin_group("Snap").unwrap();

    assert!(!history.append_to_group(Scripted::noop(&journal, "same")).unwrap());
    assert_eq!(history.open_group_len(), Some(0));
    assert!(!history.commit_group().unwrap());
    assert!(history.is_empty());
}

#[test]
fn test_empty_group_is_never_committed_but_still_truncates() {
    let (_board, journal) = fixture();
    let mut history = CommandHistory::new();
    history.push_command(Scripted::ok(&journal, "a")).unwrap();
    history.push_command(Scripted::ok(&journal, "b")).unwrap();
    history.undo().unwrap();

    history.begin_group("Nothing").unwrap();
    assert!(!history.commit_group().unwrap());

    assert_eq!(history.labels().collect::<Vec<_>>(), ["a"]);
    assert!(!history.can_redo());
    assert!(!history.is_group_open());
}

#[test]
fn test_prebuilt_group_runs_children_on_push() {
    let (_board, journal) = fixture();
    let mut group = CommandGroup::new("Paste");
    group.append_child(Box::new(Scripted::ok(&journal, "r1"))).unwrap();
    group.append_child(Box::new(Scripted::ok(&journal, "r2"))).unwrap();
    assert!(entries(&journal).is_empty());
    assert_eq!(group.child_labels().collect::<Vec<_>>(), ["r1", "r2"]);

    let mut history = CommandHistory::new();
    assert!(history.push_command(group).unwrap());
    history.undo().unwrap();
    assert_eq!(entries(&journal), ["exec r1", "exec r2", "undo r2", "undo r1"]);
}

#[test]
fn test_prebuilt_group_failure_rolls_back() {
    let (_board, journal) = fixture();
    let mut group = CommandGroup::new("Paste");
    group.append_child(Box::new(Scripted::ok(&journal, "r1"))).unwrap();
    group
        .append_child(Box::new(Scripted::failing(&journal, "r2", FailOn::Execute)))
        .unwrap();

    let mut history = CommandHistory::new();
    assert!(history.push_command(group).unwrap_err().is_edit_failed());
    assert!(history.is_empty());
    assert_eq!(entries(&journal), ["exec r1", "fail exec r2", "undo r1"]);
}

#[test]
fn test_empty_or_noop_prebuilt_group_is_discarded() {
    let (_board, journal) = fixture();
    let mut history = CommandHistory::new();
    assert!(!history.push_command(CommandGroup::new("Empty")).unwrap());

    let mut group = CommandGroup::new("Idle");
    group.append_child(Box::new(Scripted::noop(&journal, "n"))).unwrap();
    assert!(!history.push_command(group).unwrap());
    assert!(history.is_empty());
}

#[test]
fn test_nested_group_appended_to_open_group() {
    let (_board, journal) = fixture();
    let mut inner = CommandGroup::new("Footprint");
    inner.append_child(Box::new(Scripted::ok(&journal, "pad1"))).unwrap();
    inner.append_child(Box::new(Scripted::ok(&journal, "pad2"))).unwrap();

    let mut history = CommandHistory::new();
    history.begin_group("Place").unwrap();
    history.append_to_group(Scripted::ok(&journal, "body")).unwrap();
    history.append_to_group(inner).unwrap();
    history.commit_group().unwrap();
    history.undo().unwrap();

    assert_eq!(
        entries(&journal),
        [
            "exec body", "exec pad1", "exec pad2", "undo pad2", "undo pad1", "undo body"
        ]
    );
}

#[test]
fn test_failed_undo_inside_group_restores_then_corrupts() {
    let (_board, journal) = fixture();
    let mut history = CommandHistory::new();
    history.begin_group("Move Selection").unwrap();
    history.append_to_group(Scripted::ok(&journal, "a")).unwrap();
    history
        .append_to_group(Scripted::failing(&journal, "b", FailOn::Undo))
        .unwrap();
    history.append_to_group(Scripted::ok(&journal, "c")).unwrap();
    history.commit_group().unwrap();

    let outcome = catch_unwind(AssertUnwindSafe(|| history.undo()));
    assert!(outcome.is_err());
    assert!(history.is_corrupted());
    assert_eq!(
        entries(&journal),
        ["exec a", "exec b", "exec c", "undo c", "fail undo b", "redo c"]
    );
}

#[test]
fn test_failed_redo_inside_group_reverts_prefix_then_corrupts() {
    let (_board, journal) = fixture();
    let mut history = CommandHistory::new();
    history.begin_group("Flip").unwrap();
    history.append_to_group(Scripted::ok(&journal, "a")).unwrap();
    history
        .append_to_group(Scripted::failing(&journal, "b", FailOn::Redo))
        .unwrap();
    history.commit_group().unwrap();
    history.undo().unwrap();

    let outcome = catch_unwind(AssertUnwindSafe(|| history.redo()));
    assert!(outcome.is_err());
    assert!(history.is_corrupted());
    assert_eq!(
        entries(&journal),
        ["exec a", "exec b", "undo b", "undo a", "redo a", "fail redo b", "undo a"]
    );
}

#[test]
#[should_panic(expected = "abort of `Drag` failed")]
fn test_failed_abort_is_fatal() {
    let (_board, journal) = fixture();
    let mut history = CommandHistory::new();
    history.begin_group("Drag").unwrap();
    history
        .append_to_group(Scripted::failing(&journal, "stuck", FailOn::Undo))
        .unwrap();
    let _ = history.abort_group();
}

#[test]
fn test_failed_rollback_after_append_corrupts_history() {
    let (_board, journal) = fixture();
    let mut history = CommandHistory::new();
    history.begin_group("Route").unwrap();
    history
        .append_to_group(Scripted::failing(&journal, "a", FailOn::Undo))
        .unwrap();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        history.append_to_group(Scripted::failing(&journal, "b", FailOn::Execute))
    }));
    assert!(outcome.is_err());
    assert!(history.is_corrupted());
    assert!(!history.is_group_open());
    assert_eq!(entries(&journal), ["exec a", "fail exec b", "fail undo a"]);

    let err = history.commit_group().unwrap_err();
    assert_eq!(err.illegal_state(), Some(IllegalState::Corrupted));
    assert_eq!(history.len(), 0);
}

#[test]
#[should_panic(expected = "append to `Route` failed: rollback after failed append in `Route` failed")]
fn test_failed_rollback_after_append_panics_with_both_labels() {
    let (_board, journal) = fixture();
    let mut history = CommandHistory::new();
    history.begin_group("Route").unwrap();
    history
        .append_to_group(Scripted::failing(&journal, "a", FailOn::Undo))
        .unwrap();
    let _ = history.append_to_group(Scripted::failing(&journal, "b", FailOn::Execute));
}

#[test]
fn test_prebuilt_group_failed_rollback_corrupts_history() {
    let (_board, journal) = fixture();
    let mut group = CommandGroup::new("Paste");
    group
        .append_child(Box::new(Scripted::failing(&journal, "r1", FailOn::Undo)))
        .unwrap();
    group
        .append_child(Box::new(Scripted::failing(&journal, "r2", FailOn::Execute)))
        .unwrap();

    let mut history = CommandHistory::new();
    let outcome = catch_unwind(AssertUnwindSafe(|| history.push_command(group)));
    assert!(outcome.is_err());
    assert!(history.is_corrupted());
    assert!(history.is_empty());
    assert_eq!(entries(&journal), ["exec r1", "fail exec r2", "fail undo r1"]);
    assert_eq!(
        history.undo().unwrap_err().illegal_state(),
        Some(IllegalState::Corrupted)
    );
}
