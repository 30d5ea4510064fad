//! Concurrency tests: racing acquires must yield exactly one winner.

use std::sync::{Arc, Barrier};
use std::thread;

use coedit_core::{HierarchyNode, HierarchySnapshot, PageId, ProjectId, SnapshotId};
use coedit_server::concurrency::{LockError, LockService, LockType, Owner, DEFAULT_LOCK_TTL};
use coedit_server::hierarchy::HierarchyCatalog;

const RACERS: usize = 16;

fn race<F>(f: F) -> Vec<Result<bool, LockError>>
where
    F: Fn(usize) -> Result<bool, LockError> + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(RACERS));
    let f = Arc::new(f);
    let handles: Vec<_> = (0..RACERS)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            let f = Arc::clone(&f);
            thread::spawn(move || {
                barrier.wait();
                f(i)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn racing_acquires_have_one_winner() {
    let service = Arc::new(LockService::with_default_ttl());
    let project = ProjectId::new("proj1");
    let page = PageId::new("p1");

    let svc = Arc::clone(&service);
    let results = race(move |i| {
        let owner = Owner::new(format!("user-{i}"), format!("User {i}"));
        svc.acquire(&project, &page, LockType::Section, &owner, true)
            .map(|lock| lock.is_some())
    });

    let winners = results.iter().filter(|r| matches!(r, Ok(true))).count();
    let losers = results
        .iter()
        .filter(|r| matches!(r, Err(LockError::AlreadyLocked { .. })))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(losers, RACERS - 1);
    assert_eq!(service.count(&ProjectId::new("proj1"), LockType::Section), 1);
}

#[test]
fn racing_correlated_acquires_have_one_winner() {
    let catalog = Arc::new(HierarchyCatalog::new());
    let project = ProjectId::new("proj1");
    // Every racer targets a different page id, all sharing one content ref.
    for variant in 0..4 {
        let nodes = (0..RACERS / 4)
            .map(|n| HierarchyNode::new(format!("v{variant}-n{n}"), Some("shared")))
            .collect();
        catalog.publish(
            project.clone(),
            HierarchySnapshot::new(SnapshotId::new(format!("v{variant}")), nodes).unwrap(),
        );
    }
    let service = Arc::new(LockService::new(DEFAULT_LOCK_TTL, catalog));

    let svc = Arc::clone(&service);
    let proj = project.clone();
    let results = race(move |i| {
        let page = PageId::new(format!("v{}-n{}", i % 4, i / 4));
        let owner = Owner::new(format!("user-{i}"), format!("User {i}"));
        svc.acquire(&proj, &page, LockType::Section, &owner, true)
            .map(|lock| lock.is_some())
    });

    assert_eq!(results.iter().filter(|r| matches!(r, Ok(true))).count(), 1);
    let locks = service.list(&project, LockType::Section);
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].claimed.len(), RACERS);
}

#[test]
fn same_owner_racing_keeps_single_lock() {
    let service = Arc::new(LockService::with_default_ttl());
    let project = ProjectId::new("proj1");

    let svc = Arc::clone(&service);
    let proj = project.clone();
    let results = race(move |i| {
        let owner = Owner::new("alice", "Alice");
        svc.acquire(&proj, &PageId::new(format!("p{i}")), LockType::Section, &owner, false)
            .map(|lock| lock.is_some())
    });

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(service.count(&project, LockType::Section), 1);
    assert!(service.exists_for_owner(&project, &"alice".into(), LockType::Section));
}

#[test]
fn unrelated_projects_lock_independently() {
    let service = Arc::new(LockService::with_default_ttl());

    let svc = Arc::clone(&service);
    let results = race(move |i| {
        let project = ProjectId::new(format!("proj-{i}"));
        let owner = Owner::new("alice", "Alice");
        svc.acquire(&project, &PageId::new("p1"), LockType::Section, &owner, true)
            .map(|lock| lock.is_some())
    });

    assert!(results.iter().all(|r| matches!(r, Ok(true))));
    assert_eq!(service.all().len(), RACERS);
}
