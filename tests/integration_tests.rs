//! Integration tests for the level matchmaking service
//!
//! These tests drive a spawned coordinator through its public gateway:
//! - Fill and timeout resolution
//! - Level window placement and tie-breaking
//! - Duplicate joins and re-attached streams
//! - Concurrent callers
//! - Delivery to absent readers

mod fixtures;

use futures::future::join_all;
use level_matchmaker::competition::{Competition, LevelRange};
use level_matchmaker::config::MatchmakingConfig;
use level_matchmaker::types::{CompetitionState, Notification, Player};
use level_matchmaker::{Matchmaker, MatchmakingError};
use proptest::prelude::*;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::assert_ok;

use fixtures::{create_test_config, join_all_in_order, spawn_matchmaker, terminal_of};

#[tokio::test(start_paused = true)]
async fn test_levels_one_to_nine_start_together_on_timeout() {
    // A window wide enough to hold levels 1..=9
    let config = MatchmakingConfig {
        level_matching_tolerance: 8,
        ..create_test_config(2, 10)
    };
    let (matchmaker, _handle, _metrics) = spawn_matchmaker(config);

    let players: Vec<(String, i64)> = (1..=9).map(|level| (format!("p{}", level), level)).collect();
    let players: Vec<(&str, i64)> = players.iter().map(|(id, l)| (id.as_str(), *l)).collect();
    let streams = join_all_in_order(&matchmaker, &players).await;

    let competitions = matchmaker.open_competitions().await.unwrap();
    assert_eq!(competitions.len(), 1);
    assert_eq!(competitions[0].member_ids.len(), 9);

    for stream in &streams {
        assert_eq!(
            terminal_of(stream).await,
            Notification::new(1, CompetitionState::Started)
        );
    }

    println!("✅ Nine players started together after timeout");
}

#[tokio::test(start_paused = true)]
async fn test_levels_one_to_nine_with_tolerance_three() {
    let (matchmaker, _handle, _metrics) = spawn_matchmaker(create_test_config(2, 10));

    let players: Vec<(String, i64)> = (1..=9).map(|level| (format!("p{}", level), level)).collect();
    let players: Vec<(&str, i64)> = players.iter().map(|(id, l)| (id.as_str(), *l)).collect();
    let streams = join_all_in_order(&matchmaker, &players).await;

    // [1, 4] takes 1..=4, [2, 8] takes 5..=8, [6, 12] is founded by 9
    let competitions = matchmaker.open_competitions().await.unwrap();
    assert_eq!(competitions.len(), 3);
    assert_eq!(competitions[0].level_range, LevelRange::new(1, 4));
    assert_eq!(competitions[1].level_range, LevelRange::new(2, 8));
    assert_eq!(competitions[2].level_range, LevelRange::new(6, 12));

    let mut outcomes = Vec::new();
    for stream in &streams {
        outcomes.push(terminal_of(stream).await);
    }

    for outcome in &outcomes[..8] {
        assert_eq!(outcome.state, CompetitionState::Started);
    }
    assert_eq!(outcomes[8], Notification::new(3, CompetitionState::Aborted));
}

#[tokio::test(start_paused = true)]
async fn test_tenth_player_fills_competition_without_timeout() {
    let (matchmaker, _handle, metrics) = spawn_matchmaker(create_test_config(2, 10));

    let ids: Vec<String> = (0..10).map(|i| format!("player-{}", i)).collect();
    let mut streams = Vec::new();
    for (index, id) in ids.iter().enumerate() {
        let stream = matchmaker.submit_join(Player::new(id.clone(), 5)).await.unwrap();

        if index < 9 {
            assert_eq!(
                stream.recv().await,
                Some(Notification::new(1, CompetitionState::WaitingForPlayers))
            );
        }
        streams.push(stream);
    }

    let started_at = Instant::now();
    for stream in &streams {
        assert_eq!(
            terminal_of(stream).await,
            Notification::new(1, CompetitionState::Started)
        );
    }
    // Resolution happened on the tenth join, not on the clock
    assert!(started_at.elapsed() < Duration::from_secs(20));

    tokio::time::sleep(Duration::from_secs(30)).await;
    let stats = matchmaker.stats().await.unwrap();
    assert_eq!(stats.competitions_started, 1);
    assert_eq!(stats.competitions_aborted, 0);
    assert_eq!(stats.open_competitions, 0);
    assert_eq!(
        metrics
            .competition()
            .competitions_resolved_total
            .with_label_values(&["started", "filled"])
            .get(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_distant_levels_split_and_lone_player_aborts() {
    let (matchmaker, _handle, _metrics) = spawn_matchmaker(create_test_config(2, 10));

    let streams = join_all_in_order(&matchmaker, &[("low", 1), ("high", 60)]).await;

    let competitions = matchmaker.open_competitions().await.unwrap();
    assert_eq!(competitions.len(), 2);
    assert_eq!(competitions[0].level_range, LevelRange::new(1, 4));
    assert_eq!(competitions[1].level_range, LevelRange::new(57, 63));

    assert_eq!(
        terminal_of(&streams[0]).await,
        Notification::new(1, CompetitionState::Aborted)
    );
    assert_eq!(
        terminal_of(&streams[1]).await,
        Notification::new(2, CompetitionState::Aborted)
    );
}

#[tokio::test]
async fn test_window_is_floored_and_fixed() {
    let (matchmaker, _handle, _metrics) = spawn_matchmaker(create_test_config(2, 10));

    let _streams = join_all_in_order(&matchmaker, &[("a", 1), ("b", 50), ("c", 3), ("d", 52)]).await;

    let competitions = matchmaker.open_competitions().await.unwrap();
    assert_eq!(competitions[0].level_range, LevelRange::new(1, 4));
    assert_eq!(competitions[1].level_range, LevelRange::new(47, 53));
    // Later members never move the window
    assert_eq!(competitions[0].member_ids, vec!["a".to_string(), "c".to_string()]);
    assert_eq!(competitions[1].member_ids, vec!["b".to_string(), "d".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_fires_after_configured_duration() {
    let config = MatchmakingConfig {
        matchmaking_timeout: Duration::from_millis(1500),
        ..create_test_config(2, 10)
    };
    let (matchmaker, _handle, _metrics) = spawn_matchmaker(config);

    let joined_at = Instant::now();
    let stream = matchmaker.submit_join(Player::new("solo", 10)).await.unwrap();

    assert_eq!(
        terminal_of(&stream).await,
        Notification::new(1, CompetitionState::Aborted)
    );
    assert!(joined_at.elapsed() >= Duration::from_millis(1500));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_join_keeps_one_membership_and_one_stream() {
    let (matchmaker, _handle, _metrics) = spawn_matchmaker(create_test_config(2, 10));

    let first = matchmaker.submit_join(Player::new("dup", 5)).await.unwrap();
    let second = matchmaker.submit_join(Player::new("dup", 5)).await.unwrap();
    assert!(first.same_stream(&second));

    let stats = matchmaker.stats().await.unwrap();
    assert_eq!(stats.pending_players, 1);
    assert_eq!(stats.duplicate_joins, 1);
    assert_eq!(matchmaker.open_competitions().await.unwrap()[0].member_ids.len(), 1);

    // One waiting notification, one terminal, shared by both handles
    assert_eq!(
        first.collect().await,
        vec![
            Notification::new(1, CompetitionState::WaitingForPlayers),
            Notification::new(1, CompetitionState::Aborted),
        ]
    );
    assert_eq!(second.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_rejoin_after_dropping_stream_reattaches() {
    let (matchmaker, _handle, _metrics) = spawn_matchmaker(create_test_config(2, 10));

    drop(matchmaker.submit_join(Player::new("p1", 5)).await.unwrap());
    let partner = matchmaker.submit_join(Player::new("p2", 5)).await.unwrap();
    let replacement = matchmaker.submit_join(Player::new("p1", 5)).await.unwrap();

    assert_eq!(
        replacement.collect().await,
        vec![
            Notification::new(1, CompetitionState::WaitingForPlayers),
            Notification::new(1, CompetitionState::Started),
        ]
    );
    assert_eq!(
        terminal_of(&partner).await,
        Notification::new(1, CompetitionState::Started)
    );
}

#[tokio::test]
async fn test_player_can_rejoin_after_resolution() {
    let (matchmaker, _handle, _metrics) = spawn_matchmaker(create_test_config(1, 1));

    let first = matchmaker.submit_join(Player::new("again", 5)).await.unwrap();
    assert_eq!(
        terminal_of(&first).await,
        Notification::new(1, CompetitionState::Started)
    );

    let second = matchmaker.submit_join(Player::new("again", 5)).await.unwrap();
    assert!(!first.same_stream(&second));
    assert_eq!(
        terminal_of(&second).await,
        Notification::new(2, CompetitionState::Started)
    );
}

#[tokio::test]
async fn test_single_seat_competitions_start_immediately() {
    let (matchmaker, _handle, _metrics) = spawn_matchmaker(create_test_config(1, 1));

    let streams = join_all_in_order(&matchmaker, &[("a", 5), ("b", 5), ("c", 5)]).await;
    for (index, stream) in streams.iter().enumerate() {
        // No waiting notification precedes an immediate start
        assert_eq!(
            stream.collect().await,
            vec![Notification::new(index as u64 + 1, CompetitionState::Started)]
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_fill_exact_competitions() {
    let (matchmaker, _handle, _metrics) = spawn_matchmaker(create_test_config(2, 5));

    let joins = (0..50).map(|i| {
        let matchmaker = matchmaker.clone();
        async move {
            let stream = matchmaker
                .submit_join(Player::new(format!("concurrent-{}", i), 10))
                .await?;
            Ok::<_, anyhow::Error>(terminal_of(&stream).await)
        }
    });

    let mut members_per_competition = std::collections::HashMap::new();
    for result in join_all(joins).await {
        let outcome = assert_ok!(result);
        assert_eq!(outcome.state, CompetitionState::Started);
        *members_per_competition
            .entry(outcome.competition_id)
            .or_insert(0) += 1;
    }

    assert_eq!(members_per_competition.len(), 10);
    assert!(members_per_competition.values().all(|count| *count == 5));

    let ids: HashSet<u64> = members_per_competition.keys().copied().collect();
    assert_eq!(ids, (1..=10).collect());
}

#[tokio::test(start_paused = true)]
async fn test_absent_reader_does_not_block_other_members() {
    let (matchmaker, _handle, metrics) = spawn_matchmaker(create_test_config(2, 3));

    let present = matchmaker.submit_join(Player::new("present", 7)).await.unwrap();
    drop(matchmaker.submit_join(Player::new("gone", 7)).await.unwrap());
    let last = matchmaker.submit_join(Player::new("last", 8)).await.unwrap();

    assert_eq!(
        terminal_of(&present).await,
        Notification::new(1, CompetitionState::Started)
    );
    assert_eq!(
        terminal_of(&last).await,
        Notification::new(1, CompetitionState::Started)
    );
    assert!(metrics.player().notifications_dropped_total.get() >= 1);
    assert_eq!(matchmaker.stats().await.unwrap().pending_players, 0);
}

#[tokio::test]
async fn test_no_notification_follows_terminal() {
    let (matchmaker, _handle, _metrics) = spawn_matchmaker(create_test_config(2, 4));

    let streams = join_all_in_order(&matchmaker, &[("a", 3), ("b", 3), ("c", 3), ("d", 3)]).await;

    for stream in &streams {
        let notifications = stream.collect().await;
        let terminal_index = notifications
            .iter()
            .position(|n| n.is_terminal())
            .expect("terminal notification");
        assert_eq!(terminal_index, notifications.len() - 1);
    }
}

#[tokio::test]
async fn test_shutdown_closes_streams_and_rejects_joins() {
    let (matchmaker, handle, _metrics) = spawn_matchmaker(create_test_config(2, 10));

    let stream = matchmaker.submit_join(Player::new("p1", 5)).await.unwrap();
    matchmaker.shutdown().await.unwrap();
    handle.await.unwrap();

    assert_eq!(
        stream.collect().await,
        vec![Notification::new(1, CompetitionState::WaitingForPlayers)]
    );

    let error = matchmaker.submit_join(Player::new("p2", 5)).await.unwrap_err();
    assert!(matches!(
        error.downcast_ref::<MatchmakingError>(),
        Some(MatchmakingError::CoordinatorUnavailable)
    ));
}

#[tokio::test]
async fn test_coordinator_stops_when_last_handle_dropped_with_open_competition() {
    let (matchmaker, handle, _metrics) = spawn_matchmaker(create_test_config(2, 10));

    let stream = matchmaker.submit_join(Player::new("p1", 5)).await.unwrap();
    assert_eq!(matchmaker.stats().await.unwrap().open_competitions, 1);
    drop(matchmaker);

    // The armed 20s clock must not keep the coordinator alive
    assert_ok!(tokio::time::timeout(Duration::from_secs(5), handle).await);
    assert_eq!(
        stream.collect().await,
        vec![Notification::new(1, CompetitionState::WaitingForPlayers)]
    );
}

#[tokio::test]
async fn test_invalid_config_is_rejected_at_spawn() {
    let result = Matchmaker::spawn(create_test_config(3, 2));
    assert!(result.is_err());
}

#[test]
fn test_competition_accepts_any_added_player() {
    let mut competition = Competition::new(1, LevelRange::new(1, 10));
    for level in 1..=9 {
        competition.add_player(Player::new(format!("test{}", level), level));
    }
    assert_eq!(competition.member_count(), 9);
}

proptest! {
    #[test]
    fn prop_window_bounds(level in 1i64..10_000, tolerance in 0u32..1_000) {
        let range = LevelRange::around(level, tolerance);

        prop_assert_eq!(range.min, (level - tolerance as i64).max(1));
        prop_assert_eq!(range.max, level + tolerance as i64);
        prop_assert!(range.contains(level));
        prop_assert!(range.min >= 1);
    }

    #[test]
    fn prop_membership_matches_window(founder in 1i64..500, candidate in -10i64..600, tolerance in 0u32..20) {
        let competition = Competition::new(1, LevelRange::around(founder, tolerance));
        let expected = candidate >= (founder - tolerance as i64).max(1)
            && candidate <= founder + tolerance as i64;

        prop_assert_eq!(
            competition.is_level_matching(&Player::new("candidate", candidate)),
            expected
        );
    }
}
