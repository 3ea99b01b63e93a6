//! Task selection, lifecycle flow and reordering through the manager.

use taskloop::{Error, Task, TaskStatus};

use crate::fixtures::{numbered_tasks, TestProject};

/// Drive the loop the way a runner would until nothing is left.
#[test]
fn test_drain_queue_in_order() {
    let project = TestProject::new();
    let manager = project.manager_with(numbered_tasks(3));
    let mut visited = Vec::new();

    while let Some(task) = manager.get_next() {
        visited.push(task.id.clone());
        manager.start_iteration(&task.id).unwrap();
        manager.end_iteration(&task.id, "DONE", "", "").unwrap();
        manager.mark_complete(&task.id).unwrap();
    }

    assert_eq!(visited, vec!["task-1", "task-2", "task-3"]);
    assert!(!manager.has_remaining());
    assert_eq!(manager.progress(), (3, 3));
}

#[test]
fn test_interrupted_task_is_picked_up_first() {
    let project = TestProject::new();
    let manager = project.manager_with(numbered_tasks(3));
    manager.start_iteration("task-3").unwrap();

    // A fresh manager over the persisted file sees the open attempt.
    let restarted = taskloop::Manager::new(project.store());
    assert_eq!(restarted.get_next().unwrap().id, "task-3");
}

#[test]
fn test_paused_before_pending() {
    let project = TestProject::new();
    let manager = project.manager_with(numbered_tasks(3));
    manager.mark_pause("task-2").unwrap();

    assert_eq!(manager.get_next().unwrap().id, "task-2");

    let iteration = manager.resume("task-2").unwrap();
    assert_eq!(iteration.number, 1);
    assert_eq!(manager.get("task-2").unwrap().status, TaskStatus::InProgress);
}

#[test]
fn test_resume_requires_paused() {
    let project = TestProject::new();
    let manager = project.manager_with(numbered_tasks(1));

    let err = manager.resume("task-1").unwrap_err();
    assert!(matches!(
        err,
        Error::NotPaused {
            status: TaskStatus::Pending,
            ..
        }
    ));
}

#[test]
fn test_terminal_tasks_are_never_selected() {
    let project = TestProject::new();
    let manager = project.manager_with(numbered_tasks(3));
    manager.mark_skip("task-1").unwrap();
    manager.mark_fail("task-2").unwrap();
    manager.mark_complete("task-3").unwrap();

    assert!(manager.get_next().is_none());
    assert_eq!(manager.count_remaining(), 0);
    assert_eq!(manager.count_completed(), 1);
    assert_eq!(manager.count_total(), 3);
}

#[test]
fn test_appended_tasks_run_last() {
    let project = TestProject::new();
    let manager = project.manager_with(numbered_tasks(2));
    manager
        .store()
        .add(Task::new("late", "Added later", ""))
        .unwrap();

    let order: Vec<_> = manager.all().into_iter().map(|t| t.id).collect();
    assert_eq!(order, vec!["task-1", "task-2", "late"]);
    assert_eq!(manager.get("late").unwrap().order, 3);
}

#[test]
fn test_reorder_then_drain() {
    let project = TestProject::new();
    let manager = project.manager_with(numbered_tasks(4));

    manager.reorder(&["task-3", "task-1"]).unwrap();

    let order: Vec<_> = manager.all().into_iter().map(|t| (t.id, t.order)).collect();
    assert_eq!(
        order,
        vec![
            ("task-3".to_string(), 1),
            ("task-1".to_string(), 2),
            ("task-2".to_string(), 3),
            ("task-4".to_string(), 4),
        ]
    );
    assert_eq!(manager.get_next().unwrap().id, "task-3");

    // Persisted with autosave.
    let reloaded = project.store();
    assert_eq!(reloaded.get("task-3").unwrap().order, 1);
}

#[test]
fn test_operations_on_unknown_task() {
    let project = TestProject::new();
    let manager = project.manager_with(numbered_tasks(1));

    assert!(matches!(
        manager.mark_complete("ghost"),
        Err(Error::TaskNotFound(_))
    ));
    assert!(matches!(
        manager.start_iteration("ghost"),
        Err(Error::TaskNotFound(_))
    ));
    assert!(matches!(
        manager.end_iteration("task-1", "DONE", "", ""),
        Err(Error::NoActiveIteration(_))
    ));
}
