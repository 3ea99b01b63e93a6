//! Save/load cycles against a real file.

use std::fs;

use taskloop::{Error, Manager, Store, Task, TaskStatus};

use crate::fixtures::{numbered_tasks, TestProject};

#[test]
fn test_reload_preserves_full_task_state() {
    let project = TestProject::new();
    let manager = project.manager_with(numbered_tasks(2));

    manager.start_iteration("task-1").unwrap();
    manager
        .end_iteration("task-1", "NEXT", "partial work", "sess-1")
        .unwrap();
    manager.start_iteration("task-1").unwrap();
    manager
        .end_iteration("task-1", "DONE", "finished", "")
        .unwrap();
    manager.mark_complete("task-1").unwrap();

    let reloaded = project.store();
    let task = reloaded.get("task-1").unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.iteration_count(), 2);
    assert_eq!(task.iterations[0].result, "NEXT");
    assert_eq!(task.iterations[1].agent_output, "finished");
    // An empty session id does not clear the one from the earlier attempt.
    assert_eq!(task.session_id, "sess-1");
    assert!(task.completed_at.is_some());
    assert_eq!(reloaded.get("task-2").unwrap().status, TaskStatus::Pending);
}

#[test]
fn test_metadata_survives_reload() {
    let project = TestProject::new();
    let mut task = Task::new("meta", "With metadata", "desc");
    task.set_metadata("ticket", "ENG-42");
    let store = project.store();
    store.add(task).unwrap();
    store.save().unwrap();

    let reloaded = project.store();
    let task = reloaded.get("meta").unwrap();
    assert_eq!(task.metadata_value("ticket"), Some("ENG-42"));
    assert_eq!(task.description, "desc");
}

#[test]
fn test_file_layout() {
    let project = TestProject::new();
    project.manager_with(numbered_tasks(1));

    let raw = fs::read_to_string(&project.state_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(json["metadata"]["version"], 1);
    assert!(json["metadata"]["created_at"].is_string());
    assert_eq!(json["tasks"][0]["id"], "task-1");
    assert_eq!(json["tasks"][0]["status"], "pending");
    assert!(json["tasks"][0]["completed_at"].is_null());
}

#[test]
fn test_second_save_leaves_backup() {
    let project = TestProject::new();
    let manager = project.manager_with(numbered_tasks(1));
    let first = fs::read_to_string(&project.state_path).unwrap();

    manager.mark_skip("task-1").unwrap();

    let backup = project.state_path.with_file_name("tasks.json.bak");
    assert_eq!(fs::read_to_string(backup).unwrap(), first);
    assert!(!project.state_path.with_file_name("tasks.json.tmp").exists());
}

#[test]
fn test_corrupt_file_is_rejected() {
    let project = TestProject::new();
    fs::create_dir_all(project.state_path.parent().unwrap()).unwrap();
    fs::write(&project.state_path, "{ not json").unwrap();

    let err = Store::open(&project.state_path).unwrap_err();
    assert!(matches!(err, Error::CorruptStore { .. }));
}

#[test]
fn test_duplicate_ids_on_disk_are_rejected() {
    let project = TestProject::new();
    project.manager_with(numbered_tasks(2));

    let raw = fs::read_to_string(&project.state_path).unwrap();
    fs::write(&project.state_path, raw.replace("task-2", "task-1")).unwrap();

    assert!(matches!(
        Store::open(&project.state_path),
        Err(Error::CorruptStore { .. })
    ));
}

#[test]
fn test_without_autosave_nothing_reaches_disk() {
    let project = TestProject::new();
    let store = project.store();
    store.add_all(numbered_tasks(1)).unwrap();
    store.save().unwrap();
    let manager = Manager::new(store);

    manager.mark_complete("task-1").unwrap();
    assert_eq!(
        project.store().get("task-1").unwrap().status,
        TaskStatus::Pending
    );

    manager.save().unwrap();
    assert_eq!(
        project.store().get("task-1").unwrap().status,
        TaskStatus::Completed
    );
}
