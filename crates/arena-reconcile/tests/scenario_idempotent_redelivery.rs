//! Re-delivery and self-triggered updates must converge without repeated
//! transitions: once a patch is applied, the store's follow-up change event
//! yields either the next legitimate transition or nothing.

use arena_reconcile::*;
use arena_schemas::{GameDocument, PlayerStatus, Winner};
use chrono::{TimeZone, Utc};
use PlayerStatus::*;

fn game(inviter: PlayerStatus, invitee: PlayerStatus) -> GameDocument {
    GameDocument::new("g1", "alice", "bob").with_statuses(inviter, invitee)
}

/// Run the trigger loop the store would drive: apply, then reconcile the
/// write-induced change, until nothing is left to do.
fn settle(mut before: GameDocument, mut after: GameDocument) -> (GameDocument, usize) {
    let mut writes = 0;
    loop {
        let patch = reconcile(&before, &after);
        if patch.is_empty() {
            return (after, writes);
        }
        assert!(is_forward(&after, &patch), "backward patch {patch:?}");
        let next = stamp(patch, Utc.timestamp_opt(1_700_000_000, 0).unwrap()).applied(&after);
        writes += 1;
        assert!(writes <= 4, "trigger loop does not converge");
        before = after;
        after = next;
    }
}

#[test]
fn scenario_applied_patch_is_stable_on_second_look() {
    let cases = [
        (game(Pending, Pending), game(Pending, Accepted)),
        (game(Ready, Accepted), game(Ready, Ready)),
        (game(Ingame, Finished), game(Finished, Finished).with_scores(7.0, 3.0)),
        (game(Ingame, Ingame), game(Ingame, Ingame)),
    ];
    for (before, after) in cases {
        let patch = reconcile(&before, &after);
        let applied = patch.applied(&after);
        assert!(
            reconcile(&applied, &applied).is_empty(),
            "not stable after {patch:?}"
        );
    }
}

#[test]
fn scenario_redelivered_event_produces_same_patch() {
    let before = game(Ready, Accepted);
    let after = game(Ready, Ready);
    assert_eq!(reconcile(&before, &after), reconcile(&before, &after));

    // Re-applying the same patch to the already-updated document changes nothing.
    let patch = reconcile(&before, &after);
    let once = patch.applied(&after);
    assert_eq!(patch.applied(&once), once);
}

#[test]
fn scenario_quit_cascades_to_ended_with_winner() {
    let before = game(Ingame, Ingame).with_scores(2.0, 6.0);
    let after = game(Finished, Ingame).with_scores(2.0, 6.0);

    let (settled, writes) = settle(before, after);
    assert_eq!(writes, 2, "finished propagation, then winner resolution");
    assert_eq!(settled.inviter_status, Some(Ended));
    assert_eq!(settled.invitee_status, Some(Ended));
    assert_eq!(settled.scores.winner, Some(Winner::Player("bob".to_string())));
    assert!(settled.updated_at.is_some());
}

#[test]
fn scenario_full_lifecycle_converges() {
    let (accepted, _) = settle(game(Pending, Pending), game(Pending, Accepted));
    assert_eq!(accepted.to_status, Some(Accepted));

    let (live, writes) = settle(accepted.clone(), accepted.with_statuses(Ready, Ready));
    assert_eq!(writes, 1);
    assert!(live.both_are(&Ingame));

    let done = live.clone().with_statuses(Finished, Finished).with_scores(4.0, 4.0);
    let (ended, writes) = settle(live, done);
    assert_eq!(writes, 1);
    assert!(ended.both_are(&Ended));
    assert_eq!(ended.scores.winner, Some(Winner::Draw));
}
