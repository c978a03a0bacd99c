//! Exhaustive check over every (before, after) status combination:
//! no backward moves, ingame/ended only together, winner set at most once.

use arena_reconcile::*;
use arena_schemas::{GameDocument, PlayerStatus, Winner};

fn all_slots() -> Vec<Option<PlayerStatus>> {
    vec![
        None,
        Some(PlayerStatus::Pending),
        Some(PlayerStatus::Accepted),
        Some(PlayerStatus::Ready),
        Some(PlayerStatus::Ingame),
        Some(PlayerStatus::Finished),
        Some(PlayerStatus::Ended),
        Some(PlayerStatus::parse("abandoned")),
    ]
}

fn doc(inviter: &Option<PlayerStatus>, invitee: &Option<PlayerStatus>) -> GameDocument {
    let mut d = GameDocument::new("g1", "alice", "bob").with_scores(3.0, 1.0);
    d.inviter_status = inviter.clone();
    d.invitee_status = invitee.clone();
    d
}

#[test]
fn scenario_invariants_hold_for_every_status_combination() {
    let slots = all_slots();
    for b1 in &slots {
        for b2 in &slots {
            for a1 in &slots {
                for a2 in &slots {
                    for winner_set in [false, true] {
                        let before = doc(b1, b2);
                        let mut after = doc(a1, a2);
                        if winner_set {
                            after.scores.winner = Some(Winner::Draw);
                        }
                        let patch = reconcile(&before, &after);
                        let ctx = format!("{before:?} -> {after:?} => {patch:?}");

                        assert!(is_forward(&after, &patch), "backward: {ctx}");

                        let next = patch.applied(&after);
                        if patch.inviter_status == Some(PlayerStatus::Ingame)
                            || patch.invitee_status == Some(PlayerStatus::Ingame)
                        {
                            assert!(next.both_are(&PlayerStatus::Ingame), "ingame alone: {ctx}");
                        }
                        if patch.inviter_status == Some(PlayerStatus::Ended)
                            || patch.invitee_status == Some(PlayerStatus::Ended)
                        {
                            assert!(next.both_are(&PlayerStatus::Ended), "ended alone: {ctx}");
                            assert!(patch.winner.is_some(), "ended without winner: {ctx}");
                        }
                        if winner_set {
                            assert_eq!(patch.winner, None, "winner overwritten: {ctx}");
                        }
                        assert_eq!(patch.updated_at, None, "reconcile must not stamp: {ctx}");
                    }
                }
            }
        }
    }
}
