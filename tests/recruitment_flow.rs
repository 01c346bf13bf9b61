//! Integration tests for recruitment boards.

mod common;

use common::TestBot;

#[tokio::test]
async fn join_accumulates_participants() {
    let bot = TestBot::start();
    bot.command("u1", "recruit", &["raid"]).await;
    let (board, first) = bot.last_sent();
    assert!(first.text.contains("**raid** (1)"));

    bot.press("u2", &board, "recruit:join").await;
    let record = bot.bot.recruitment.get(&board).unwrap();
    assert_eq!(
        record.participants.iter().collect::<Vec<_>>(),
        ["u1", "u2"]
    );
    assert!(bot.view(&board).text.contains("<@u2>"));

    let posts_before = bot.posts().len();
    bot.press("u1", &board, "recruit:join").await;
    bot.press("u2", &board, "recruit:join").await;
    assert_eq!(bot.bot.recruitment.get(&board).unwrap().participants.len(), 2);
    assert_eq!(bot.posts().len(), posts_before);
}

#[tokio::test]
async fn full_board_rejects_newcomers() {
    let bot = TestBot::start();
    bot.command("u1", "recruit", &["duo", "2"]).await;
    let (board, _) = bot.last_sent();

    bot.press("u2", &board, "recruit:join").await;
    assert!(bot.view(&board).text.contains("(2/2)"));

    bot.press("u3", &board, "recruit:join").await;
    assert_eq!(
        bot.posts().last().map(String::as_str),
        Some("This group is already full (2 members).")
    );

    bot.press("u2", &board, "recruit:leave").await;
    bot.press("u3", &board, "recruit:join").await;
    let participants = bot.bot.recruitment.get(&board).unwrap().participants;
    assert!(participants.contains("u3"));
    assert!(!participants.contains("u2"));
}

#[tokio::test]
async fn boards_are_independent_of_sessions() {
    let bot = TestBot::start();
    bot.command("u1", "recruit", &["raid"]).await;
    let (board, _) = bot.last_sent();

    assert_eq!(bot.bot.sessions.active_count(), 0);
    bot.press("u4", &board, "recruit:join").await;
    assert!(bot.bot.recruitment.get(&board).unwrap().participants.contains("u4"));
}

#[tokio::test]
async fn forgotten_board_asks_for_a_new_one() {
    let bot = TestBot::start();
    bot.command("u1", "recruit", &["raid"]).await;
    let (board, _) = bot.last_sent();
    bot.bot.recruitment.clear();

    bot.press("u2", &board, "recruit:join").await;
    assert_eq!(
        bot.posts().last().map(String::as_str),
        Some("This recruitment is no longer tracked, start a new one.")
    );
}

#[tokio::test]
async fn bad_arguments_are_reported() {
    let bot = TestBot::start();
    bot.command("u1", "recruit", &[]).await;
    bot.command("u1", "recruit", &["raid", "zero"]).await;

    assert_eq!(
        bot.posts(),
        [
            "Usage: recruit <role> [capacity]",
            "Invalid argument: capacity must be a positive number, got `zero`",
        ]
    );
    assert!(bot.bot.recruitment.is_empty());
}
