use layout::{Animator, LayoutEngine, LayoutStrategy, Positions};
use meshflow_core::config::AnimationConfig;
use meshflow_core::model::{Node, Position};
use std::time::Duration;

fn positions(points: &[(u64, f64, f64)]) -> Positions {
    points
        .iter()
        .map(|(id, x, y)| (*id, Position::new(*x, *y)))
        .collect()
}

fn animator(duration_ms: u64) -> Animator {
    Animator::new(AnimationConfig {
        duration_ms,
        frame_interval_ms: 16,
    })
}

#[tokio::test(start_paused = true)]
async fn test_animation_runs_from_start_to_target() {
    let start = positions(&[(1, 0.0, 0.0), (2, 10.0, 10.0), (3, 20.0, 20.0)]);
    let target = positions(&[(1, 100.0, 100.0), (2, 110.0, 90.0), (3, 90.0, 110.0)]);

    let (handle, mut frames) = animator(1000).animate_frames(start.clone(), target.clone());
    let outcome = handle.finished().await;

    let mut received = Vec::new();
    while let Ok(frame) = frames.try_recv() {
        received.push(frame);
    }

    assert!(outcome.completed);
    assert_eq!(outcome.frames, received.len());
    assert!(received.len() > 50);
    assert_eq!(received.first().unwrap().positions, start);
    assert_eq!(received.last().unwrap().positions, target);
    assert!(received.last().unwrap().last);
    assert!(received
        .windows(2)
        .all(|pair| pair[0].progress <= pair[1].progress));
    assert_eq!(outcome.positions, Some(target));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_leaves_consistent_frame() {
    let start = positions(&[(1, 0.0, 0.0), (2, 0.0, 100.0)]);
    let target = positions(&[(1, 100.0, 0.0), (2, 100.0, 100.0)]);
    let animator = animator(2000);

    let (handle, mut frames) = animator.animate_frames(start, target);
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.cancel();
    let outcome = handle.finished().await;

    assert!(!outcome.completed);
    assert!(outcome.frames > 0);
    let last = outcome.positions.unwrap();
    // Both nodes are at the same point of the same eased curve.
    assert_eq!(last.len(), 2);
    assert_eq!(last[&1].x, last[&2].x);
    assert!(last[&1].x > 0.0 && last[&1].x < 100.0);

    let mut count = 0;
    while frames.try_recv().is_ok() {
        count += 1;
    }
    assert_eq!(count, outcome.frames);
    assert_eq!(animator.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_new_animation_supersedes_same_node_set() {
    let animator = animator(1000);
    let start = positions(&[(1, 0.0, 0.0), (2, 5.0, 5.0)]);
    let first_target = positions(&[(1, 50.0, 50.0), (2, 60.0, 60.0)]);
    let second_target = positions(&[(1, -50.0, -50.0), (2, -60.0, -60.0)]);

    let first = animator.animate(start.clone(), first_target, |_| {});
    let second = animator.animate(start, second_target.clone(), |_| {});

    let first = first.finished().await;
    let second = second.finished().await;

    assert!(!first.completed);
    assert!(second.completed);
    assert_eq!(second.positions, Some(second_target));
    assert_eq!(animator.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_disjoint_node_sets_run_side_by_side() {
    let animator = animator(500);
    let a = animator.animate(
        positions(&[(1, 0.0, 0.0)]),
        positions(&[(1, 10.0, 0.0)]),
        |_| {},
    );
    let b = animator.animate(
        positions(&[(2, 0.0, 0.0)]),
        positions(&[(2, 0.0, 10.0)]),
        |_| {},
    );
    assert_eq!(animator.active(), 2);

    assert!(a.finished().await.completed);
    assert!(b.finished().await.completed);
}

#[tokio::test(start_paused = true)]
async fn test_layout_then_animate() {
    let nodes = vec![
        Node::new(1, 1, "hub", "").with_position(0.0, 0.0),
        Node::new(2, 1, "a", "").with_position(0.0, 0.0),
        Node::new(3, 1, "b", "").with_position(0.0, 0.0),
    ];
    let engine = LayoutEngine::default();
    let target = engine
        .compute(LayoutStrategy::Radial { center: 1 }, &nodes, &[])
        .unwrap();

    let handle = animator(300).animate(layout::current_positions(&nodes), target.clone(), |_| {});
    let outcome = handle.finished().await;
    assert_eq!(outcome.positions, Some(target));
}
