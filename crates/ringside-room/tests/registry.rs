//! Integration tests for the room registry.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ringside_protocol::{CallerId, Facing, PlayerId, RoomCreated, RoomStatus, StateSnapshot, Vec2};
use ringside_room::{RegistryConfig, RoomError, RoomRegistry};

// =========================================================================
// Helpers
// =========================================================================

fn registry() -> RoomRegistry {
    RoomRegistry::new(RegistryConfig::default())
}

/// Creates a room and seats a second player. Returns (room, host, guest).
fn paired(reg: &RoomRegistry) -> (RoomCreated, PlayerId) {
    let created = reg.create_room("Ryu", "karateka", CallerId::random()).unwrap();
    let joined = reg
        .join_room(&created.room_id, "Ken", "brawler", CallerId::random())
        .unwrap();
    (created, joined.player_id)
}

fn snapshot(health: f32) -> StateSnapshot {
    StateSnapshot {
        position: Vec2::new(320.0, 0.0),
        velocity: Vec2::new(-2.5, 0.0),
        health,
        stamina: 75.0,
        facing: Facing::Left,
        action: "light_punch".into(),
        frame: 4,
        attacking: true,
        blocking: false,
        airborne: false,
    }
}

// =========================================================================
// Create / join
// =========================================================================

#[test]
fn test_create_room_registers_waiting_room() {
    let reg = registry();
    let created = reg.create_room("Ryu", "karateka", CallerId::random()).unwrap();

    assert!(reg.contains(&created.room_id));
    assert_eq!(created.room_id.as_str().len(), 6);
    let info = reg.room_info(&created.room_id).unwrap();
    assert_eq!(info.status, RoomStatus::Waiting);
    assert_eq!(info.players, 1);
    assert_eq!(info.host_name.as_deref(), Some("Ryu"));
}

#[test]
fn test_create_room_rejects_bad_names() {
    let reg = registry();
    let err = reg.create_room("", "karateka", CallerId::random()).unwrap_err();
    assert!(matches!(err, RoomError::InvalidInput(_)));
    let err = reg
        .create_room("Ryu", &"x".repeat(33), CallerId::random())
        .unwrap_err();
    assert!(matches!(err, RoomError::InvalidInput(_)));
    assert_eq!(reg.room_count(), 0);
}

#[test]
fn test_join_unknown_room_is_not_found() {
    let reg = registry();
    let err = reg
        .join_room(&"zzzzzz".into(), "Ken", "brawler", CallerId::random())
        .unwrap_err();
    assert!(matches!(err, RoomError::NotFound(_)));
}

#[test]
fn test_join_own_room_is_self_join() {
    let reg = registry();
    let caller = CallerId::random();
    let created = reg.create_room("Ryu", "karateka", caller).unwrap();

    let err = reg
        .join_room(&created.room_id, "Ryu again", "karateka", caller)
        .unwrap_err();
    assert!(matches!(err, RoomError::SelfJoin(_)));
}

#[test]
fn test_third_join_is_room_full() {
    let reg = registry();
    let (created, _) = paired(&reg);

    let err = reg
        .join_room(&created.room_id, "Chun", "kicker", CallerId::random())
        .unwrap_err();
    assert!(matches!(err, RoomError::RoomFull(_)));
    assert_eq!(reg.room_info(&created.room_id).unwrap().players, 2);
}

#[test]
fn test_caller_capacity_is_enforced_without_eviction() {
    let reg = registry();
    let caller = CallerId::random();
    let rooms: Vec<_> = (0..3)
        .map(|_| reg.create_room("Ryu", "karateka", caller).unwrap())
        .collect();

    let err = reg.create_room("Ryu", "karateka", caller).unwrap_err();
    assert!(matches!(err, RoomError::CapacityExceeded { limit: 3, .. }));
    for created in &rooms {
        assert!(reg.contains(&created.room_id));
    }

    // Another caller is unaffected.
    reg.create_room("Ken", "brawler", CallerId::random()).unwrap();

    // Closing one frees a slot.
    reg.leave_room(&rooms[0].room_id, &rooms[0].player_id).unwrap();
    reg.create_room("Ryu", "karateka", caller).unwrap();
}

#[test]
fn test_capacity_follows_the_current_host() {
    let reg = registry();
    let creator = CallerId::random();
    let guest_caller = CallerId::random();
    let rooms: Vec<_> = (0..3)
        .map(|_| reg.create_room("Ryu", "karateka", creator).unwrap())
        .collect();

    // The creator leaves the first room; its guest takes over as host.
    reg.join_room(&rooms[0].room_id, "Ken", "brawler", guest_caller)
        .unwrap();
    reg.leave_room(&rooms[0].room_id, &rooms[0].player_id).unwrap();
    assert!(reg.contains(&rooms[0].room_id));

    // The creator no longer owns it, so one slot is free again.
    reg.create_room("Ryu", "karateka", creator).unwrap();
    let err = reg.create_room("Ryu", "karateka", creator).unwrap_err();
    assert!(matches!(err, RoomError::CapacityExceeded { limit: 3, .. }));

    // The promoted guest owns one room now.
    for _ in 0..2 {
        reg.create_room("Ken", "brawler", guest_caller).unwrap();
    }
    let err = reg.create_room("Ken", "brawler", guest_caller).unwrap_err();
    assert!(matches!(err, RoomError::CapacityExceeded { limit: 3, .. }));
    assert_eq!(
        reg.room_info(&rooms[0].room_id).unwrap().host_name.as_deref(),
        Some("Ken")
    );
}

// =========================================================================
// Readiness
// =========================================================================

#[test]
fn test_playing_only_when_both_ready() {
    let reg = registry();
    let (created, guest) = paired(&reg);
    let room = &created.room_id;

    let host_view = reg.set_ready(room, &created.player_id, true).unwrap();
    assert_eq!(host_view.room_status, RoomStatus::Waiting);
    assert!(!host_view.opponent_ready);

    let guest_view = reg.check_opponent_ready(room, &guest).unwrap();
    assert!(guest_view.opponent_ready);

    let guest_view = reg.set_ready(room, &guest, true).unwrap();
    assert_eq!(guest_view.room_status, RoomStatus::Playing);
    assert_eq!(guest_view.round, 1);

    let host_view = reg.check_opponent_ready(room, &created.player_id).unwrap();
    assert!(host_view.opponent_ready);
    assert_eq!(host_view.room_status, RoomStatus::Playing);
}

#[test]
fn test_rematch_after_finish_starts_round_two() {
    let reg = registry();
    let (created, guest) = paired(&reg);
    let room = &created.room_id;
    reg.set_ready(room, &created.player_id, true).unwrap();
    reg.set_ready(room, &guest, true).unwrap();

    reg.finish_match(room, &guest).unwrap();
    let info = reg.room_info(room).unwrap();
    assert_eq!(info.status, RoomStatus::Finished);
    assert!(!info.host_ready && !info.guest_ready);

    reg.set_ready(room, &created.player_id, true).unwrap();
    let state = reg.set_ready(room, &guest, true).unwrap();
    assert_eq!(state.room_status, RoomStatus::Playing);
    assert_eq!(state.round, 2);
}

#[test]
fn test_player_token_is_scoped_to_its_room() {
    let reg = registry();
    let (a, _) = paired(&reg);
    let (b, _) = paired(&reg);

    let err = reg.set_ready(&b.room_id, &a.player_id, true).unwrap_err();
    assert!(matches!(err, RoomError::PlayerNotFound(..)));
}

// =========================================================================
// State sync
// =========================================================================

#[test]
fn test_opponent_state_is_none_before_first_push() {
    let reg = registry();
    let (created, guest) = paired(&reg);
    assert_eq!(reg.get_opponent_state(&created.room_id, &guest).unwrap(), None);
}

#[test]
fn test_update_then_get_returns_identical_snapshot() {
    let reg = registry();
    let (created, guest) = paired(&reg);

    reg.update_state(&created.room_id, &created.player_id, snapshot(100.0))
        .unwrap();
    let seen = reg.get_opponent_state(&created.room_id, &guest).unwrap();
    assert_eq!(seen, Some(snapshot(100.0)));
}

#[test]
fn test_last_writer_wins() {
    let reg = registry();
    let (created, guest) = paired(&reg);

    for health in [100.0, 90.0, 72.5] {
        reg.update_state(&created.room_id, &created.player_id, snapshot(health))
            .unwrap();
    }
    let seen = reg.get_opponent_state(&created.room_id, &guest).unwrap();
    assert_eq!(seen.map(|s| s.health), Some(72.5));
}

// =========================================================================
// Leave
// =========================================================================

#[test]
fn test_emptied_room_is_removed_immediately() {
    let reg = registry();
    let (created, guest) = paired(&reg);
    let room = &created.room_id;

    let left = reg.leave_room(room, &guest).unwrap();
    assert!(!left.room_removed);
    assert!(reg.contains(room));

    let left = reg.leave_room(room, &created.player_id).unwrap();
    assert!(left.room_removed);
    assert!(!reg.contains(room));
    assert!(matches!(
        reg.room_info(room).unwrap_err(),
        RoomError::NotFound(_)
    ));
}

#[test]
fn test_host_leave_promotes_guest_and_resets() {
    let reg = registry();
    let (created, guest) = paired(&reg);
    let room = &created.room_id;
    reg.set_ready(room, &created.player_id, true).unwrap();
    reg.set_ready(room, &guest, true).unwrap();

    reg.leave_room(room, &created.player_id).unwrap();

    let info = reg.room_info(room).unwrap();
    assert_eq!(info.status, RoomStatus::Waiting);
    assert_eq!(info.players, 1);
    assert_eq!(info.host_name.as_deref(), Some("Ken"));
    assert!(!info.host_ready);

    // The promoted host can take a new opponent.
    reg.join_room(room, "Chun", "kicker", CallerId::random()).unwrap();
}

#[test]
fn test_leave_twice_is_not_found() {
    let reg = registry();
    let (created, guest) = paired(&reg);
    reg.leave_room(&created.room_id, &guest).unwrap();
    let err = reg.leave_room(&created.room_id, &guest).unwrap_err();
    assert!(matches!(err, RoomError::PlayerNotFound(..)));
}

// =========================================================================
// Reaper
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_idle_room_is_reaped_regardless_of_status() {
    let reg = registry();
    let (playing, guest) = paired(&reg);
    reg.set_ready(&playing.room_id, &playing.player_id, true).unwrap();
    reg.set_ready(&playing.room_id, &guest, true).unwrap();
    let waiting = reg.create_room("Solo", "karateka", CallerId::random()).unwrap();

    tokio::time::advance(Duration::from_secs(301)).await;
    let mut reaped = reg.reap_idle(Duration::from_secs(300));
    reaped.sort();

    let mut expected = vec![playing.room_id.clone(), waiting.room_id.clone()];
    expected.sort();
    assert_eq!(reaped, expected);
    assert_eq!(reg.room_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_polling_keeps_room_alive() {
    let reg = registry();
    let created = reg.create_room("Ryu", "karateka", CallerId::random()).unwrap();

    for _ in 0..10 {
        tokio::time::advance(Duration::from_secs(60)).await;
        reg.check_opponent_ready(&created.room_id, &created.player_id)
            .unwrap();
        assert!(reg.reap_idle(Duration::from_secs(300)).is_empty());
    }
    assert!(reg.contains(&created.room_id));
}

#[tokio::test(start_paused = true)]
async fn test_reaped_room_frees_caller_capacity() {
    let reg = registry();
    let caller = CallerId::random();
    for _ in 0..3 {
        reg.create_room("Ryu", "karateka", caller).unwrap();
    }
    tokio::time::advance(Duration::from_secs(301)).await;
    assert_eq!(reg.reap_idle(Duration::from_secs(300)).len(), 3);
    reg.create_room("Ryu", "karateka", caller).unwrap();
}

// =========================================================================
// Stats / concurrency
// =========================================================================

#[test]
fn test_stats_counts_rooms_and_players() {
    let reg = registry();
    let (created, guest) = paired(&reg);
    reg.set_ready(&created.room_id, &created.player_id, true).unwrap();
    reg.set_ready(&created.room_id, &guest, true).unwrap();
    reg.create_room("Solo", "karateka", CallerId::random()).unwrap();

    let stats = reg.stats();
    assert_eq!(stats.rooms, 2);
    assert_eq!(stats.playing, 1);
    assert_eq!(stats.waiting, 1);
    assert_eq!(stats.finished, 0);
    assert_eq!(stats.players, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_yield_distinct_ids() {
    let reg = Arc::new(registry());
    let mut tasks = Vec::new();
    for _ in 0..200 {
        let reg = Arc::clone(&reg);
        tasks.push(tokio::spawn(async move {
            reg.create_room("Ryu", "karateka", CallerId::random()).unwrap().room_id
        }));
    }

    let mut ids = HashSet::new();
    for task in tasks {
        ids.insert(task.await.unwrap());
    }
    assert_eq!(ids.len(), 200);
    assert_eq!(reg.room_count(), 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_seat_exactly_one_guest() {
    let reg = Arc::new(registry());
    let created = reg.create_room("Ryu", "karateka", CallerId::random()).unwrap();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let reg = Arc::clone(&reg);
        let room = created.room_id.clone();
        tasks.push(tokio::spawn(async move {
            reg.join_room(&room, "Ken", "brawler", CallerId::random())
        }));
    }

    let mut seated = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => seated += 1,
            Err(err) => assert!(matches!(err, RoomError::RoomFull(_))),
        }
    }
    assert_eq!(seated, 1);
    assert_eq!(reg.room_info(&created.room_id).unwrap().players, 2);
}
