//! Rule precedence and guard boundaries of the match reconciler.

use arena_reconcile::*;
use arena_schemas::{GameDocument, GamePatch, PlayerStatus};
use PlayerStatus::*;

fn game(inviter: PlayerStatus, invitee: PlayerStatus) -> GameDocument {
    GameDocument::new("g1", "alice", "bob").with_statuses(inviter, invitee)
}

#[test]
fn scenario_early_exit_dominates_unmet_ready() {
    let before = game(Ingame, Ready);
    let after = game(Finished, Ready);

    let r = reconcile_report(&before, &after);
    assert_eq!(r.fired, vec![RuleId::EarlyTermination]);

    let next = r.patch.applied(&after);
    assert_eq!(next.inviter_status, Some(Finished));
    assert_eq!(next.invitee_status, Some(Finished));
    assert_eq!(r.patch.invitee_status, Some(Finished));
}

#[test]
fn scenario_ready_guard_boundary_one_side_ingame_before() {
    // Guard is "NOT both ingame": one side ingame before still fires.
    let p = reconcile(&game(Ingame, Ready), &game(Ready, Ready));
    assert_eq!(p, GamePatch::both(Ingame));
}

#[test]
fn scenario_ready_guard_suppresses_when_both_were_ingame() {
    let r = reconcile_report(&game(Ingame, Ingame), &game(Ready, Ready));
    assert!(r.fired.is_empty());
    assert!(!r.requires_write());
}

#[test]
fn scenario_live_match_does_not_retrigger_start() {
    let live = game(Ingame, Ingame);
    assert!(reconcile(&live, &live).is_empty());
    assert!(reconcile(&game(Ready, Ready), &live).is_empty());
}

#[test]
fn scenario_acceptance_and_ready_fold_into_one_patch() {
    // Invitee jumps pending → accepted while the inviter is ready: only the
    // signal fields change, statuses stay.
    let p = reconcile(&game(Ready, Pending), &game(Ready, Accepted));
    assert_eq!(p.to_status, Some(Accepted));
    assert_eq!(p.from_status, Some(Accepted));
    assert_eq!(p.inviter_status, None);
}

#[test]
fn scenario_unknown_or_missing_statuses_fire_nothing() {
    let mut after = game(Ready, Ready);
    after.invitee_status = Some(PlayerStatus::parse("READY"));
    assert!(reconcile(&after, &after).is_empty());

    after.invitee_status = None;
    assert!(reconcile(&GameDocument::default(), &after).is_empty());
    assert!(reconcile(&GameDocument::default(), &GameDocument::default()).is_empty());
}

#[test]
fn scenario_ended_match_is_inert() {
    let mut ended = game(Ended, Ended).with_scores(3.0, 1.0);
    ended.scores.winner = arena_schemas::Winner::parse("alice");
    let before = game(Finished, Finished);
    assert!(reconcile(&before, &ended).is_empty());
    assert!(reconcile(&ended, &ended).is_empty());
}
