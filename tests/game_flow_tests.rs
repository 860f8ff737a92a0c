use std::time::Duration;

use uuid::Uuid;

use gamenight::games::GameState;
use gamenight::registry::models::{RoomConfig, RoomStatus};
use gamenight::{CommandError, GameType, MessageType, SessionRegistry};

mod utils;

use utils::*;

async fn room_status(setup: &TestSetup, room_id: &str) -> RoomStatus {
    let shared = setup.registry.get(room_id).await.expect("room should exist");
    let room = shared.lock().await;
    room.status
}

async fn player_score(setup: &TestSetup, room_id: &str, participant_id: &str) -> i64 {
    let shared = setup.registry.get(room_id).await.expect("room should exist");
    let room = shared.lock().await;
    room.player(participant_id).expect("player should exist").score
}

async fn current_drawer(setup: &TestSetup, room_id: &str) -> String {
    let shared = setup.registry.get(room_id).await.expect("room should exist");
    let room = shared.lock().await;
    match &room.state {
        GameState::DrawingGuess(state) => state.drawer_id.clone(),
        _ => panic!("not a drawing room"),
    }
}

async fn drawer_word(setup: &TestSetup, drawer: &str) -> String {
    let payloads = setup
        .fanout
        .payloads_of(drawer, MessageType::WordOptions)
        .await;
    let options = payloads.last().expect("drawer should have word options");
    options["options"][0]
        .as_str()
        .expect("options should be strings")
        .to_string()
}

#[tokio::test]
async fn test_quiz_round_ends_early_and_game_completes() {
    let setup = TestSetup::new();
    let summary = setup
        .service
        .create_room(
            GameType::QuizMatch,
            "a".to_string(),
            "A".to_string(),
            RoomConfig {
                total_rounds: 1,
                round_seconds: 30,
            },
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    let room_id = summary.id;

    setup
        .service
        .join_room(&room_id, "b".to_string(), "B".to_string(), Uuid::new_v4())
        .await
        .unwrap();
    setup
        .service
        .join_room(&room_id, "c".to_string(), "C".to_string(), Uuid::new_v4())
        .await
        .unwrap();
    setup.service.start_game(&room_id, "a").await.unwrap();

    // B and C answer correctly before the clock runs out; A is wrong.
    setup
        .service
        .submit_answer(&room_id, "b", CORRECT_CHOICE)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    setup
        .service
        .submit_answer(&room_id, "c", CORRECT_CHOICE)
        .await
        .unwrap();
    setup
        .service
        .submit_answer(&room_id, "a", WRONG_CHOICE)
        .await
        .unwrap();

    // The last submission closed the round without waiting for the
    // timer, and one configured round means the game is over.
    assert_eq!(room_status(&setup, &room_id).await, RoomStatus::Finished);
    assert!(setup.fanout.received("a", MessageType::RoundResults).await);
    assert!(setup.fanout.received("a", MessageType::GameOver).await);

    let b_score = player_score(&setup, &room_id, "b").await;
    let c_score = player_score(&setup, &room_id, "c").await;
    let a_score = player_score(&setup, &room_id, "a").await;
    assert!(b_score > 0 && c_score > 0);
    assert!(b_score > c_score, "earlier correct answer should score higher");
    assert_eq!(a_score, 0);
}

#[tokio::test]
async fn test_drawing_turn_ends_early_when_all_guess() {
    let setup = TestSetup::new();
    let summary = setup
        .service
        .create_room(
            GameType::DrawingGuess,
            "a".to_string(),
            "A".to_string(),
            RoomConfig {
                total_rounds: 1,
                round_seconds: 60,
            },
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    let room_id = summary.id;

    setup
        .service
        .join_room(&room_id, "b".to_string(), "B".to_string(), Uuid::new_v4())
        .await
        .unwrap();
    setup
        .service
        .join_room(&room_id, "c".to_string(), "C".to_string(), Uuid::new_v4())
        .await
        .unwrap();
    setup.service.start_game(&room_id, "a").await.unwrap();

    let drawer = current_drawer(&setup, &room_id).await;
    let word = drawer_word(&setup, &drawer).await;
    setup.service.select_word(&room_id, &drawer, 0).await.unwrap();

    let guessers: Vec<String> = ["a", "b", "c"]
        .iter()
        .map(|s| s.to_string())
        .filter(|id| *id != drawer)
        .collect();
    for guesser in &guessers {
        setup
            .service
            .submit_guess(&room_id, guesser, Some(word.clone()), None)
            .await
            .unwrap();
    }

    // Both non-drawers got it, so the turn closed without the timer.
    assert!(setup.fanout.received(&drawer, MessageType::TurnEnd).await);
    {
        let shared = setup.registry.get(&room_id).await.unwrap();
        let room = shared.lock().await;
        match &room.state {
            GameState::DrawingGuess(state) => {
                assert_eq!(state.correct_guessers.len(), 2);
            }
            _ => panic!("not a drawing room"),
        }
    }

    // Two correct guessers at 5 points apiece for the drawer.
    assert_eq!(player_score(&setup, &room_id, &drawer).await, 10);
    for guesser in &guessers {
        assert!(player_score(&setup, &room_id, guesser).await >= 10);
    }
}

#[tokio::test(start_paused = true)]
async fn test_drawing_game_progresses_to_game_over() {
    let setup = TestSetup::new();
    let summary = setup
        .service
        .create_room(
            GameType::DrawingGuess,
            "a".to_string(),
            "A".to_string(),
            RoomConfig {
                total_rounds: 1,
                round_seconds: 60,
            },
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    let room_id = summary.id;
    setup
        .service
        .join_room(&room_id, "b".to_string(), "B".to_string(), Uuid::new_v4())
        .await
        .unwrap();
    setup.service.start_game(&room_id, "a").await.unwrap();

    // Turn one.
    let drawer = current_drawer(&setup, &room_id).await;
    let guesser = if drawer == "a" { "b" } else { "a" };
    let word = drawer_word(&setup, &drawer).await;
    setup.service.select_word(&room_id, &drawer, 0).await.unwrap();
    setup
        .service
        .submit_guess(&room_id, guesser, Some(word), None)
        .await
        .unwrap();
    assert_eq!(room_status(&setup, &room_id).await, RoomStatus::Playing);

    // Wait out the inter-turn pause; the roles swap for turn two.
    tokio::time::sleep(Duration::from_secs(6)).await;
    let second_drawer = current_drawer(&setup, &room_id).await;
    assert_ne!(second_drawer, drawer);

    let second_guesser = if second_drawer == "a" { "b" } else { "a" };
    let word = drawer_word(&setup, &second_drawer).await;
    setup
        .service
        .select_word(&room_id, &second_drawer, 0)
        .await
        .unwrap();
    setup
        .service
        .submit_guess(&room_id, second_guesser, Some(word), None)
        .await
        .unwrap();

    // Every player has drawn once in the single configured round.
    assert_eq!(room_status(&setup, &room_id).await, RoomStatus::Finished);
    assert!(setup.fanout.received("a", MessageType::GameOver).await);
    assert!(setup.fanout.received("b", MessageType::GameOver).await);
}

#[tokio::test(start_paused = true)]
async fn test_quiz_timer_expiry_scores_missing_answers_as_zero() {
    let setup = TestSetup::new();
    let summary = setup
        .service
        .create_room(
            GameType::QuizMatch,
            "a".to_string(),
            "A".to_string(),
            RoomConfig {
                total_rounds: 1,
                round_seconds: 5,
            },
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    let room_id = summary.id;
    setup
        .service
        .join_room(&room_id, "b".to_string(), "B".to_string(), Uuid::new_v4())
        .await
        .unwrap();
    setup.service.start_game(&room_id, "a").await.unwrap();

    setup
        .service
        .submit_answer(&room_id, "b", CORRECT_CHOICE)
        .await
        .unwrap();

    // A never answers; the round closes on expiry.
    tokio::time::sleep(Duration::from_secs(7)).await;
    assert_eq!(room_status(&setup, &room_id).await, RoomStatus::Finished);
    assert!(player_score(&setup, &room_id, "b").await >= 1000);
    assert_eq!(player_score(&setup, &room_id, "a").await, 0);
}

#[tokio::test]
async fn test_reconnection_preserves_score_and_turn_position() {
    let setup = TestSetup::new();
    let old_connection = Uuid::new_v4();
    let summary = setup
        .service
        .create_room(
            GameType::QuizMatch,
            "a".to_string(),
            "A".to_string(),
            RoomConfig::default(),
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    let room_id = summary.id;
    setup
        .service
        .join_room(&room_id, "b".to_string(), "B".to_string(), old_connection)
        .await
        .unwrap();

    {
        let shared = setup.registry.get(&room_id).await.unwrap();
        let mut room = shared.lock().await;
        room.player_mut("b").unwrap().score = 777;
    }

    // B reconnects on a fresh handle; the old socket's leave arrives
    // afterwards and must not remove the player.
    let new_connection = Uuid::new_v4();
    setup
        .service
        .join_room(&room_id, "b".to_string(), "B".to_string(), new_connection)
        .await
        .unwrap();
    setup.service.leave_room(&room_id, old_connection).await;

    let shared = setup.registry.get(&room_id).await.unwrap();
    let room = shared.lock().await;
    assert_eq!(room.players.len(), 2);
    assert_eq!(room.player_index("b"), Some(1), "turn position unchanged");
    let b = room.player("b").unwrap();
    assert_eq!(b.score, 777, "score survives reconnection");
    assert_eq!(b.connection, new_connection, "handle was replaced");
}

#[tokio::test]
async fn test_room_capacity_limit() {
    let setup = TestSetup::new();
    let summary = setup
        .service
        .create_room(
            GameType::CodeBreaker,
            "host".to_string(),
            "Host".to_string(),
            RoomConfig::default(),
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    for i in 0..7 {
        setup
            .service
            .join_room(
                &summary.id,
                format!("p{}", i),
                format!("P{}", i),
                Uuid::new_v4(),
            )
            .await
            .unwrap();
    }

    let result = setup
        .service
        .join_room(
            &summary.id,
            "late".to_string(),
            "Late".to_string(),
            Uuid::new_v4(),
        )
        .await;
    assert!(matches!(result, Err(CommandError::RoomFull)));
}

#[tokio::test]
async fn test_host_transfer_and_empty_room_destruction() {
    let setup = TestSetup::new();
    let host_connection = Uuid::new_v4();
    let bob_connection = Uuid::new_v4();
    let summary = setup
        .service
        .create_room(
            GameType::QuizMatch,
            "a".to_string(),
            "A".to_string(),
            RoomConfig::default(),
            None,
            host_connection,
        )
        .await
        .unwrap();
    let room_id = summary.id;
    setup
        .service
        .join_room(&room_id, "b".to_string(), "B".to_string(), bob_connection)
        .await
        .unwrap();

    setup.service.leave_room(&room_id, host_connection).await;
    {
        let shared = setup.registry.get(&room_id).await.unwrap();
        let room = shared.lock().await;
        assert_eq!(room.host_id, "b");
    }
    assert!(setup.fanout.received("b", MessageType::HostChange).await);

    setup.service.leave_room(&room_id, bob_connection).await;
    assert!(setup.registry.get(&room_id).await.is_none());
}

#[tokio::test]
async fn test_start_game_requires_host_and_enough_players() {
    let setup = TestSetup::new();
    let summary = setup
        .service
        .create_room(
            GameType::QuizMatch,
            "a".to_string(),
            "A".to_string(),
            RoomConfig::default(),
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    let room_id = summary.id;

    let result = setup.service.start_game(&room_id, "a").await;
    assert!(matches!(result, Err(CommandError::NotEnoughPlayers(_))));

    setup
        .service
        .join_room(&room_id, "b".to_string(), "B".to_string(), Uuid::new_v4())
        .await
        .unwrap();
    let result = setup.service.start_game(&room_id, "b").await;
    assert!(matches!(result, Err(CommandError::NotAuthorized(_))));

    setup.service.start_game(&room_id, "a").await.unwrap();
    assert_eq!(room_status(&setup, &room_id).await, RoomStatus::Playing);

    // Starting twice is rejected: status only moves forward.
    let result = setup.service.start_game(&room_id, "a").await;
    assert!(matches!(result, Err(CommandError::WrongPhase)));
}

#[tokio::test]
async fn test_lobby_watchers_receive_updates() {
    let setup = TestSetup::new();

    // A watcher asks for quiz rooms before any exist.
    setup
        .service
        .list_open_rooms(GameType::QuizMatch, None, "watcher")
        .await;
    let initial = setup
        .fanout
        .payloads_of("watcher", MessageType::RoomList)
        .await;
    assert_eq!(initial.len(), 1);
    assert_eq!(initial[0]["rooms"].as_array().unwrap().len(), 0);

    let summary = setup
        .service
        .create_room(
            GameType::QuizMatch,
            "a".to_string(),
            "A".to_string(),
            RoomConfig::default(),
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    let after_create = setup
        .fanout
        .payloads_of("watcher", MessageType::RoomList)
        .await;
    assert_eq!(
        after_create.last().unwrap()["rooms"].as_array().unwrap().len(),
        1
    );

    // Starting the game closes the room for joining.
    setup
        .service
        .join_room(&summary.id, "b".to_string(), "B".to_string(), Uuid::new_v4())
        .await
        .unwrap();
    setup.service.start_game(&summary.id, "a").await.unwrap();
    let after_start = setup
        .fanout
        .payloads_of("watcher", MessageType::RoomList)
        .await;
    assert_eq!(
        after_start.last().unwrap()["rooms"].as_array().unwrap().len(),
        0
    );
}

#[tokio::test]
async fn test_code_breaker_turn_flow_with_solve() {
    let setup = TestSetup::new();
    let summary = setup
        .service
        .create_room(
            GameType::CodeBreaker,
            "a".to_string(),
            "A".to_string(),
            RoomConfig {
                total_rounds: 1,
                round_seconds: 60,
            },
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    let room_id = summary.id;
    setup
        .service
        .join_room(&room_id, "b".to_string(), "B".to_string(), Uuid::new_v4())
        .await
        .unwrap();
    setup.service.start_game(&room_id, "a").await.unwrap();

    let maker = {
        let shared = setup.registry.get(&room_id).await.unwrap();
        let room = shared.lock().await;
        match &room.state {
            GameState::CodeBreaker(state) => state.code_maker_id.clone(),
            _ => panic!("not a code-breaker room"),
        }
    };
    let breaker = if maker == "a" { "b" } else { "a" };

    setup
        .service
        .set_code_options(
            &room_id,
            &maker,
            gamenight::games::CodeAlphabet::Numbers,
            gamenight::games::Difficulty::Easy,
        )
        .await
        .unwrap();
    setup
        .service
        .submit_secret(&room_id, &maker, vec![1, 2, 3, 4])
        .await
        .unwrap();

    // A wrong guess produces a clue, a right one ends the turn.
    setup
        .service
        .submit_guess(&room_id, breaker, None, Some(vec![4, 3, 2, 2]))
        .await
        .unwrap();
    assert!(setup.fanout.received(breaker, MessageType::GuessResult).await);
    setup
        .service
        .submit_guess(&room_id, breaker, None, Some(vec![1, 2, 3, 4]))
        .await
        .unwrap();

    assert!(setup.fanout.received(&maker, MessageType::TurnEnd).await);
    let solver_score = player_score(&setup, &room_id, breaker).await;
    assert!(solver_score > 0, "solver earns points");

    // The secret is only revealed at turn end, never before.
    let turn_ends = setup
        .fanout
        .payloads_of(breaker, MessageType::TurnEnd)
        .await;
    assert_eq!(turn_ends.last().unwrap()["secret"], serde_json::json!([1, 2, 3, 4]));
}
