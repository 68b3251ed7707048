//! Reconciler behavior against an in-memory canvas

use megaverse_core::{
    CanvasError, Entity, GoalMap, Operation, Position, Reconciler, RemoteError, StatusCode,
};
use megaverse_test_utils::{cross_goal_grid, grid, occupancy, FakeCanvas};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

async fn reconciler_for(fake: &Arc<FakeCanvas>, parallel_degree: usize) -> Reconciler {
    Reconciler::bootstrap(fake.clone(), parallel_degree)
        .await
        .unwrap()
}

fn positions(calls: &[megaverse_test_utils::RecordedCall]) -> HashSet<Position> {
    calls.iter().map(|call| call.entity.position).collect()
}

#[tokio::test]
async fn clear_deletes_every_occupied_cell() {
    let fake = Arc::new(FakeCanvas::new(cross_goal_grid()).with_content(occupancy(&cross_goal_grid())));
    let reconciler = reconciler_for(&fake, 2).await;

    let report = reconciler.clear().await;

    assert!(report.is_complete());
    assert_eq!(report.succeeded, 4);
    let deletes = fake.calls_for(Operation::Delete);
    assert_eq!(deletes.len(), 4);
    assert!(deletes
        .iter()
        .all(|call| call.entity == Entity::delete_target(call.entity.position)));
    assert_eq!(
        positions(&deletes),
        HashSet::from([
            Position::new(0, 1),
            Position::new(1, 0),
            Position::new(1, 2),
            Position::new(2, 1),
        ])
    );
}

#[tokio::test]
async fn clear_on_empty_canvas_makes_no_calls() {
    let fake = Arc::new(FakeCanvas::new(cross_goal_grid()));
    let reconciler = reconciler_for(&fake, 2).await;

    let report = reconciler.clear().await;

    assert!(report.is_complete());
    assert_eq!(report.attempted, 0);
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn clear_absorbs_fetch_failure() {
    let fake = Arc::new(FakeCanvas::new(cross_goal_grid()).without_content());
    let reconciler = reconciler_for(&fake, 2).await;

    let report = reconciler.clear().await;

    assert!(report.aborted.is_some());
    assert!(!report.is_complete());
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn clear_absorbs_failed_delete() {
    let fake = Arc::new(
        FakeCanvas::new(cross_goal_grid())
            .with_content(occupancy(&cross_goal_grid()))
            .failing_at(Operation::Delete, Position::new(1, 0), StatusCode::BAD_REQUEST),
    );
    let reconciler = reconciler_for(&fake, 2).await;

    let report = reconciler.clear().await;

    assert_eq!(report.attempted, 4);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].entity.position, Position::new(1, 0));
    assert_eq!(fake.calls_for(Operation::Delete).len(), 4);
}

#[tokio::test]
async fn replicate_clears_then_creates_goal() {
    let fake = Arc::new(FakeCanvas::new(cross_goal_grid()).with_content(occupancy(&cross_goal_grid())));
    let reconciler = reconciler_for(&fake, 3).await;

    let report = reconciler.replicate().await.unwrap();

    assert_eq!(report.operation, Operation::Create);
    assert_eq!(report.succeeded, 4);
    assert_eq!(fake.reads(), 2);

    let calls = fake.calls();
    assert_eq!(calls.len(), 8);
    assert!(calls[..4].iter().all(|call| call.operation == Operation::Delete));
    assert!(calls[4..].iter().all(|call| call.operation == Operation::Create));
    assert_eq!(
        positions(&calls[4..]),
        reconciler
            .goal()
            .entities()
            .iter()
            .map(|entity| entity.position)
            .collect::<HashSet<_>>()
    );
}

#[tokio::test]
async fn replicate_runs_every_create_before_reporting_failure() {
    let fake = Arc::new(FakeCanvas::new(cross_goal_grid()).failing_at(
        Operation::Create,
        Position::new(0, 1),
        StatusCode::BAD_REQUEST,
    ));
    let reconciler = reconciler_for(&fake, 2).await;

    let err = reconciler.replicate().await.unwrap_err();

    assert_eq!(fake.calls_for(Operation::Create).len(), 4);
    match err {
        CanvasError::Batch {
            operation,
            failed,
            attempted,
            source,
        } => {
            assert_eq!(operation, Operation::Create);
            assert_eq!(failed, 1);
            assert_eq!(attempted, 4);
            assert!(matches!(source, RemoteError::Status { status, .. } if status == StatusCode::BAD_REQUEST));
        }
        other => panic!("expected Batch error, got {other:?}"),
    }
}

#[tokio::test]
async fn replicate_proceeds_when_clear_cannot_fetch() {
    let fake = Arc::new(FakeCanvas::new(cross_goal_grid()).without_content());
    let reconciler = reconciler_for(&fake, 2).await;

    let report = reconciler.replicate().await.unwrap();

    assert_eq!(report.succeeded, 4);
    assert!(fake.calls_for(Operation::Delete).is_empty());
}

#[tokio::test(start_paused = true)]
async fn in_flight_calls_never_exceed_parallel_degree() {
    let tags: Vec<Vec<String>> = vec![vec!["POLYANET".to_string(); 4]; 4];
    let fake = Arc::new(
        FakeCanvas::new(tags.clone())
            .with_content(occupancy(&tags))
            .with_latency(Duration::from_millis(50)),
    );
    let reconciler = reconciler_for(&fake, 3).await;

    reconciler.replicate().await.unwrap();

    assert_eq!(fake.calls().len(), 32);
    assert_eq!(fake.max_in_flight(), 3);
}

#[tokio::test]
async fn single_create_checks_bounds_before_calling() {
    let fake = Arc::new(FakeCanvas::new(cross_goal_grid()));
    let reconciler = reconciler_for(&fake, 2).await;

    let err = reconciler.create(&Entity::polyanet(3, 0)).await.unwrap_err();

    assert!(err.is_out_of_bounds());
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn single_delete_checks_bounds_before_calling() {
    let fake = Arc::new(FakeCanvas::new(cross_goal_grid()));
    let reconciler = reconciler_for(&fake, 2).await;

    let err = reconciler.delete(Position::new(0, 9)).await.unwrap_err();

    assert!(matches!(
        err,
        CanvasError::OutOfBounds { rows: 3, cols: 3, .. }
    ));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn single_operations_reach_the_api() {
    let fake = Arc::new(FakeCanvas::new(cross_goal_grid()));
    let reconciler = reconciler_for(&fake, 2).await;

    reconciler.create(&Entity::polyanet(2, 2)).await.unwrap();
    reconciler.delete(Position::new(2, 2)).await.unwrap();

    let calls = fake.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].operation, Operation::Create);
    assert_eq!(calls[1].operation, Operation::Delete);
    assert_eq!(calls[1].entity, Entity::delete_target(Position::new(2, 2)));
}

#[tokio::test]
async fn terminal_single_failure_surfaces_as_remote_error() {
    let fake = Arc::new(FakeCanvas::new(cross_goal_grid()).failing_at(
        Operation::Create,
        Position::new(0, 0),
        StatusCode::BAD_REQUEST,
    ));
    let reconciler = reconciler_for(&fake, 2).await;

    let err = reconciler.create(&Entity::polyanet(0, 0)).await.unwrap_err();
    assert!(matches!(err, CanvasError::Remote(_)));
}

#[tokio::test]
async fn out_of_bounds_batch_makes_no_calls() {
    let fake = Arc::new(FakeCanvas::new(cross_goal_grid()));
    let reconciler = reconciler_for(&fake, 2).await;

    let err = reconciler
        .create_batch(vec![Entity::polyanet(0, 0), Entity::polyanet(5, 5)])
        .await
        .unwrap_err();

    assert!(err.is_out_of_bounds());
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn draw_x_creates_both_diagonals() {
    let tags = vec![vec!["SPACE".to_string(); 5]; 5];
    let fake = Arc::new(FakeCanvas::new(tags));
    let reconciler = reconciler_for(&fake, 2).await;

    let report = reconciler.draw_x(1).await.unwrap();

    assert_eq!(report.succeeded, 5);
    assert!(fake.calls_for(Operation::Delete).is_empty());
    assert_eq!(
        positions(&fake.calls()),
        HashSet::from([
            Position::new(1, 1),
            Position::new(1, 3),
            Position::new(2, 2),
            Position::new(3, 1),
            Position::new(3, 3),
        ])
    );
}

#[tokio::test]
async fn draw_x_rejects_non_square_goal() {
    let fake = Arc::new(FakeCanvas::new(grid(&[&["SPACE", "SPACE", "POLYANET"]])));
    let reconciler = reconciler_for(&fake, 2).await;

    let err = reconciler.draw_x(0).await.unwrap_err();

    assert!(matches!(err, CanvasError::NotSquare { rows: 1, cols: 3 }));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn bootstrap_propagates_goal_errors() {
    let fake = Arc::new(FakeCanvas::new(grid(&[&["SPACE"], &["SPACE", "SPACE"]])));

    let err = Reconciler::bootstrap(fake, 2).await.unwrap_err();
    assert!(matches!(err, CanvasError::RaggedGrid { row: 1, .. }));
}

#[test]
fn zero_parallel_degree_is_raised() {
    let goal = GoalMap::from_grid(&cross_goal_grid()).unwrap();
    let reconciler = Reconciler::new(Arc::new(FakeCanvas::new(cross_goal_grid())), goal, 0);
    assert_eq!(reconciler.parallel_degree(), 1);
}
