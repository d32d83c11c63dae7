use futures::future::join_all;
use saga_block::{BlockManager, StatusCode};
use saga_test_utils::{create_hero, setup_manager, spawn_idle_child, spawn_loading_child};
use saga_world::{AtomicOperation, EntityKind, Operator, TypedId, Value, ValueMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_edits_on_one_block_are_serialized() {
    let manager = Arc::new(setup_manager());
    let block = spawn_idle_child(&manager, vec![create_hero()]).await;

    let tasks = (0..50).map(|_| {
        let manager = Arc::clone(&manager);
        let block = block.clone();
        tokio::spawn(async move {
            manager
                .apply_or_queue_operations(
                    &block,
                    &[AtomicOperation::modify(EntityKind::Character, "hero", "xp", Operator::Add, 1)],
                )
                .await
                .unwrap()
        })
    });
    for outcome in join_all(tasks).await {
        assert!(outcome.unwrap().is_applied());
    }

    let snapshot = manager.get_block(&block).unwrap();
    let hero = snapshot
        .current_world()
        .unwrap()
        .find(&TypedId::new(EntityKind::Character, "hero"))
        .unwrap();
    assert_eq!(hero.attribute("xp"), Some(&Value::Int(50)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_children_of_one_parent_stay_dense() {
    let manager = Arc::new(setup_manager());
    let root = manager.root_id().clone();

    let tasks = (0..20).map(|_| {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.create_child(None, ValueMap::new()).await.unwrap() })
    });
    let children: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().id().clone())
        .collect();

    let root_block = manager.get_block(&root).unwrap();
    let listed = root_block.block().children();
    assert_eq!(listed.len(), 20);
    for child in &children {
        assert!(listed.contains(child));
    }
    assert_eq!(root_block.block().selected_child_index(), Some(19));
    assert_eq!(manager.len(), 21);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_completion_racing_edits_keeps_every_queued_edit() {
    let manager: Arc<BlockManager> = Arc::new(setup_manager());
    let child = spawn_loading_child(&manager).await;

    let edits = (0..10).map(|i| {
        let manager = Arc::clone(&manager);
        let child = child.clone();
        tokio::spawn(async move {
            manager
                .apply_or_queue_operations(
                    &child,
                    &[AtomicOperation::create(EntityKind::Item, format!("item_{i}"))],
                )
                .await
                .unwrap()
        })
    });
    let outcomes = join_all(edits).await;

    manager
        .handle_generator_completion(&child, true, String::new(), vec![create_hero()], ValueMap::new())
        .await
        .unwrap();

    let block = manager.get_block(&child).unwrap();
    assert_eq!(block.code(), StatusCode::Idle);
    let applied = outcomes
        .into_iter()
        .filter(|o| o.as_ref().is_ok_and(|o| o.is_applied()))
        .count();
    assert_eq!(applied, 10);
    assert_eq!(block.current_world().unwrap().live_entities().count(), 11);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_long_batch_does_not_stall_reads_of_other_blocks() {
    let manager = Arc::new(setup_manager());
    let busy = spawn_idle_child(&manager, vec![create_hero()]).await;
    let mut others = Vec::new();
    for _ in 0..200 {
        others.push(spawn_idle_child(&manager, vec![]).await);
    }

    let batch: Vec<_> = (0..300_000)
        .map(|_| AtomicOperation::modify(EntityKind::Character, "hero", "xp", Operator::Add, 1))
        .collect();
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let manager = Arc::clone(&manager);
        let done = Arc::clone(&done);
        tokio::task::spawn_blocking(move || {
            let mut worst = Duration::ZERO;
            while !done.load(Ordering::Acquire) {
                for id in &others {
                    let started = Instant::now();
                    manager.get_block(id).unwrap();
                    worst = worst.max(started.elapsed());
                }
            }
            worst
        })
    };
    let writer = {
        let manager = Arc::clone(&manager);
        let busy = busy.clone();
        tokio::spawn(async move {
            let outcome = manager.apply_or_queue_operations(&busy, &batch).await;
            done.store(true, Ordering::Release);
            outcome
        })
    };

    assert!(writer.await.unwrap().unwrap().is_applied());
    let worst = reader.await.unwrap();
    assert!(worst < Duration::from_millis(50), "unrelated read took {worst:?}");

    let hero = manager.get_block(&busy).unwrap();
    let hero = hero
        .current_world()
        .unwrap()
        .find(&TypedId::new(EntityKind::Character, "hero"))
        .unwrap()
        .attribute("xp")
        .cloned();
    assert_eq!(hero, Some(Value::Int(300_000)));
}
