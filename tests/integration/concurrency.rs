//! Shared store and manager across threads.

use std::sync::Arc;
use std::thread;

use taskloop::{Task, TaskStatus};

use crate::fixtures::{numbered_tasks, TestProject};

const WORKERS: usize = 8;

#[test]
fn test_concurrent_adds_keep_every_task() {
    let project = TestProject::new();
    let store = project.store();

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..25 {
                    let id = format!("w{}-{}", worker, i);
                    store.add(Task::new(&id, "Concurrent", "")).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.count(), WORKERS * 25);
    store.save().unwrap();
    assert_eq!(project.store().count(), WORKERS * 25);
}

#[test]
fn test_concurrent_lifecycle_updates_are_not_lost() {
    let project = TestProject::new();
    let manager = Arc::new(project.manager_with(numbered_tasks(WORKERS as u32)));

    let handles: Vec<_> = (1..=WORKERS)
        .map(|i| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let id = format!("task-{}", i);
                for _ in 0..5 {
                    manager.start_iteration(&id).unwrap();
                    manager.end_iteration(&id, "NEXT", "", "").unwrap();
                }
                manager.mark_complete(&id).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(manager.progress(), (WORKERS, WORKERS));
    for task in project.store().tasks() {
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.iteration_count(), 5);
        let numbers: Vec<u32> = task.iterations.iter().map(|it| it.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }
}

#[test]
fn test_readers_see_consistent_snapshots() {
    let project = TestProject::new();
    let manager = Arc::new(project.manager_with(numbered_tasks(20)));

    let writer = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            for i in 1..=20 {
                manager.mark_complete(&format!("task-{}", i)).unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..200 {
                    let (completed, total) = manager.progress();
                    assert_eq!(total, 20);
                    assert!(completed >= last);
                    last = completed;
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(manager.count_remaining(), 0);
}
