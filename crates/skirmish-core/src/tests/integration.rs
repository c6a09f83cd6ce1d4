//! Integration tests for the full combat pipeline.
//!
//! These run real combats through the orchestrator and check:
//! - The reference duel resolves exactly as the damage formula predicts
//! - Poison ticks land on the global grid
//! - Stacked poison keeps its first application time
//! - Fleeing, defeat and experience policies end-to-end

use crate::combatant::CombatantId;
use crate::config::{CombatConfig, ExperiencePolicy};
use crate::orchestrator::{CombatOrchestrator, CombatPhase};
use crate::random::ScriptedRandom;
use crate::state::{CombatOutcome, TurnKind};
use crate::status::{StatusEffect, StatusEffectKind};

use super::helpers::{hero, monster, poisonous_monster};

// =============================================================================
// Reference Duel
// =============================================================================

#[test]
fn reference_duel_resolves_as_predicted() {
    let result = CombatOrchestrator::default()
        .run(
            &[hero("Aria", 100, 20, 10, 15)],
            &[monster("Rat", 20, 6, 4, 5)],
            ScriptedRandom::constant(0.5),
        )
        .unwrap();

    assert_eq!(result.outcome, CombatOutcome::HeroVictory);
    assert_eq!(result.experience_gained, 30);
    assert_eq!(result.turns.len(), 3);

    let hits: Vec<_> = result
        .turns
        .iter()
        .filter(|t| t.actor == Some(CombatantId::new(0)))
        .collect();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|t| t.action.damage == Some(18)));

    assert_eq!(result.turns[0].timestamp, 55);
    assert_eq!(result.turns[1].timestamp, 85);
    assert_eq!(result.turns[2].timestamp, 110);
    assert_eq!(result.turns[2].target_health_after, Some(0));
    assert_eq!(result.summary, "Aria defeated Rat in 3 turns.");
}

#[test]
fn record_reward_policy_end_to_end() {
    let config = CombatConfig {
        experience: ExperiencePolicy::RecordReward,
        ..CombatConfig::default()
    };
    let result = CombatOrchestrator::new(config)
        .unwrap()
        .run(
            &[hero("Aria", 100, 20, 10, 15)],
            &[monster("Rat", 20, 6, 4, 5)],
            ScriptedRandom::constant(0.5),
        )
        .unwrap();
    assert_eq!(result.experience_gained, 20);
}

#[test]
fn armoured_golem_victory_saturates_experience() {
    let result = CombatOrchestrator::default()
        .run(
            &[hero("Aria", 100, 20, 10, 15)],
            &[monster("Golem", 1, 0, 3_000_000_000, 0)],
            ScriptedRandom::constant(0.5),
        )
        .unwrap();
    assert_eq!(result.outcome, CombatOutcome::HeroVictory);
    assert_eq!(result.turns[0].action.damage, Some(1));
    assert_eq!(result.experience_gained, u32::MAX);
}

// =============================================================================
// Status Effects Through The Loop
// =============================================================================

#[test]
fn poison_ticks_follow_the_global_grid() {
    // A slow, harmless hero keeps the clock moving without ending the fight.
    let mut session = CombatOrchestrator::default()
        .session(
            &[hero("Aria", 1_000, 1, 200, 0)],
            &[monster("Dummy", 1_000, 1, 200, 30)],
            ScriptedRandom::constant(0.5),
        )
        .unwrap();
    let aria = CombatantId::new(0);
    session.step();

    // Dummy acts every 10 units; poison Aria at t=20 as if applied mid-interval.
    while session.combat().current_time() < 20 {
        session.step();
    }
    session.apply_status_effect(aria, StatusEffect::poisoned(300, 5));

    let mut health_at = Vec::new();
    while session.combat().current_time() < 260 {
        session.step();
        health_at.push((session.combat().current_time(), session.combat().combatant(aria).health()));
    }

    let before = |t: u64| {
        health_at
            .iter()
            .filter(|(time, _)| *time < t)
            .map(|(_, h)| *h)
            .min()
            .unwrap()
    };
    let at = |t: u64| {
        health_at
            .iter()
            .find(|(time, _)| *time >= t)
            .map(|(_, h)| *h)
            .unwrap()
    };

    // The dummy hits for 1 per action; poison adds exactly 5 at 100 and 200.
    let ticks: Vec<_> = session
        .combat()
        .turns()
        .iter()
        .filter(|t| t.action.kind == TurnKind::StatusEffects)
        .map(|t| t.status_changes[0].damage)
        .collect();
    assert_eq!(ticks, vec![5, 5]);
    assert!(at(100) < before(100));
    assert!(at(200) < before(200));
}

#[test]
fn stacked_poison_keeps_first_application_time() {
    let mut session = CombatOrchestrator::default()
        .session(
            &[hero("Aria", 1_000, 1, 200, 0)],
            &[monster("Dummy", 1_000, 1, 200, 30)],
            ScriptedRandom::constant(0.5),
        )
        .unwrap();
    let aria = CombatantId::new(0);
    session.apply_status_effect(aria, StatusEffect::poisoned(300, 5));
    session.step();
    while session.combat().current_time() < 50 {
        session.step();
    }
    session.apply_status_effect(aria, StatusEffect::poisoned(300, 7));

    let poison = session
        .combat()
        .combatant(aria)
        .status_effect(StatusEffectKind::Poisoned)
        .unwrap();
    assert_eq!(poison.damage_over_time(), 12);
    assert_eq!(poison.applied_at(), 0);
    assert_eq!(poison.expires_at(), 350);
}

#[test]
fn spider_poisons_then_stacks() {
    let result = CombatOrchestrator::default()
        .run(
            &[hero("Aria", 300, 12, 10, 5)],
            &[poisonous_monster("Spider", 60, 6, 4, 30)],
            ScriptedRandom::constant(0.5),
        )
        .unwrap();

    let descriptions: Vec<&str> = result
        .turns
        .iter()
        .filter(|t| t.actor == Some(CombatantId::new(1)))
        .map(|t| t.action.description.as_str())
        .collect();
    assert_eq!(
        descriptions[0],
        "Spider releases toxic secretions, poisoning Aria!"
    );
    assert_eq!(descriptions[1], "Spider intensifies the poison on Aria! (Stack 2)");
}

// =============================================================================
// Endings
// =============================================================================

#[test]
fn overwhelmed_party_is_defeated() {
    let result = CombatOrchestrator::default()
        .run(
            &[hero("Squire", 30, 5, 2, 5)],
            &[monster("Dragon", 500, 60, 40, 20)],
            ScriptedRandom::constant(0.5),
        )
        .unwrap();
    assert_eq!(result.outcome, CombatOutcome::HeroDefeat);
    assert_eq!(result.experience_gained, 0);
    assert_eq!(result.final_health("hero-0-Squire"), Some(0));
}

#[test]
fn lucky_flee_ends_the_fight() {
    // At 10% health the 0.05 roll passes the 0.1 flee check.
    let mut heroes = vec![hero("Aria", 100, 20, 10, 15)];
    heroes[0].health = 10;
    let mut session = CombatOrchestrator::default()
        .session(
            &heroes,
            &[monster("Ogre", 200, 5, 10, 5)],
            ScriptedRandom::constant(0.05),
        )
        .unwrap();
    assert_eq!(session.run_to_end(), CombatPhase::Fled);
    let result = session.into_result();
    assert_eq!(result.outcome, CombatOutcome::HeroFled);
    assert_eq!(result.experience_gained, 0);
    assert!(result.combatant("hero-0-Aria").unwrap().has_fled);
    assert_eq!(result.summary, "Aria fled from Ogre after 1 turns.");
}
