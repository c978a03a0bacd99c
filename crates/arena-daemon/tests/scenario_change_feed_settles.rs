//! With the memory store's feed attached, a client write is reconciled by
//! the adapter, the adapter's own write comes back through the feed as a
//! no-op, and the document settles.

use std::sync::Arc;
use std::time::Duration;

use arena_daemon::{feed, state::AppState, state::BusMsg};
use arena_schemas::{GameDocument, PlayerStatus, Winner};
use tokio::sync::broadcast;

async fn next_game_msg(rx: &mut broadcast::Receiver<BusMsg>) -> (String, Vec<String>) {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for bus message")
            .expect("bus closed");
        if let BusMsg::GameReconciled { outcome, rules, .. } = msg {
            return (outcome, rules);
        }
    }
}

#[tokio::test]
async fn match_runs_from_invite_to_winner() {
    let st = Arc::new(AppState::in_memory().unwrap());
    let mut bus = st.bus.subscribe();
    feed::spawn_change_feed(Arc::clone(&st)).expect("memory store has a feed");

    let base = GameDocument::new("g1", "alice", "bob");
    st.store.insert_game(base.clone()).await.unwrap();

    // Invitee accepts.
    st.store
        .replace_game(base.clone().with_statuses(PlayerStatus::Pending, PlayerStatus::Accepted))
        .await
        .unwrap();
    assert_eq!(next_game_msg(&mut bus).await.0, "applied");
    // The adapter's own write echoes back and changes nothing.
    assert_eq!(next_game_msg(&mut bus).await.0, "no_change");

    let g = st.store.get_game("g1").await.unwrap().unwrap();
    assert_eq!(g.doc.to_status, Some(PlayerStatus::Accepted));
    assert_eq!(g.doc.from_status, Some(PlayerStatus::Accepted));

    // Both ready: the match starts.
    let mut doc = g.doc.clone();
    doc.inviter_status = Some(PlayerStatus::Ready);
    doc.invitee_status = Some(PlayerStatus::Ready);
    st.store.replace_game(doc).await.unwrap();
    let (outcome, rules) = next_game_msg(&mut bus).await;
    assert_eq!(outcome, "applied");
    assert_eq!(rules, vec!["mutual_ready_start".to_string()]);
    assert_eq!(next_game_msg(&mut bus).await.0, "no_change");

    // One side finishes with the better score: rule 3 drags the other side
    // along, then the echo of that write resolves the winner.
    let mut doc = st.store.get_game("g1").await.unwrap().unwrap().doc;
    doc.inviter_status = Some(PlayerStatus::Finished);
    doc.scores.user1 = 9.0;
    doc.scores.user2 = 4.0;
    st.store.replace_game(doc).await.unwrap();

    assert_eq!(next_game_msg(&mut bus).await.0, "applied"); // both finished
    let (outcome, rules) = next_game_msg(&mut bus).await;
    assert_eq!(outcome, "applied"); // winner + ended
    assert!(rules.contains(&"winner_resolution".to_string()));
    assert_eq!(next_game_msg(&mut bus).await.0, "no_change");

    let g = st.store.get_game("g1").await.unwrap().unwrap();
    assert!(g.doc.both_are(&PlayerStatus::Ended));
    assert_eq!(g.doc.scores.winner, Some(Winner::Player("alice".to_string())));
    assert!(g.doc.updated_at.is_some());
}
