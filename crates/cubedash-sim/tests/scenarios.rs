//! End-to-end scenarios: levels loaded from JSON, played through the
//! `Simulation` trait, with reports forwarded the way the runner does it.

use cubedash_core::simulation::{forward_reports, render_frame};
use cubedash_core::test_helpers::{
    RecordingPersistenceSink, RecordingRenderSink, contract_complete_is_frozen,
    contract_deterministic, run_ticks, run_until,
};
use cubedash_core::{CompletionRecord, InputFrame, SimEvent, Simulation};
use cubedash_sim::{Explorer, Level, Phase, Run, SimConfig};

const SAMPLE_LEVEL: &str = include_str!("../../../demos/levels/sample.json");

/// Flat floor, one spike at x = 10, finish line at x = 15.
const ONE_SPIKE: &str = r#"{
    "name": "One Spike",
    "settings": { "gamemode": "cube", "speed": 10 },
    "objects": [
        { "type": "death.basic-spike", "data": { "x": 10, "y": 0 } }
    ]
}"#;

/// A single coin on the floor, finish line at x = 10.
const ONE_COIN: &str = r#"{
    "name": "One Coin",
    "objects": [
        { "type": "special.coin", "data": { "x": 5, "y": 0 } }
    ],
    "completion": { "percentage": 12, "coins": [false] }
}"#;

// ================================================================
// Loading
// ================================================================

#[test]
fn sample_level_loads() {
    let level = Level::from_json(SAMPLE_LEVEL).unwrap();
    assert_eq!(level.name, "First Steps");
    assert_eq!(level.coin_count(), 2);
    assert_eq!(level.obstacles().len(), 17);
    assert!(level.start_pos().is_none());
    assert_eq!(level.stage_width(), 65.0);
}

#[test]
fn saved_level_reloads_with_record() {
    let mut level = Level::from_json(SAMPLE_LEVEL).unwrap();
    level.completion = CompletionRecord {
        percentage: 37,
        coins: vec![true, false],
    };
    let json = level.to_json().unwrap();
    let reloaded = Level::from_json(&json).unwrap();
    assert_eq!(reloaded.name, level.name);
    assert_eq!(reloaded.obstacles().len(), level.obstacles().len());
    assert_eq!(reloaded.coin_count(), 2);
    assert_eq!(reloaded.completion, level.completion);
}

#[test]
fn recorded_coins_are_marked_on_the_first_frame() {
    let level = Level::from_json(
        r#"{
            "objects": [
                { "type": "block.basic-block", "data": { "x": 2, "y": 4 } },
                { "type": "special.coin", "data": { "x": 8, "y": 3 } }
            ],
            "completion": { "percentage": 100, "coins": [true] }
        }"#,
    )
    .unwrap();
    let run = Run::new(level, SimConfig::default());
    let mut render = RecordingRenderSink::default();
    render_frame(&run, &mut render);

    let obstacles = &render.frames[0].2;
    assert!(!obstacles[0].previously_collected);
    assert!(obstacles[1].previously_collected);
    assert!(!obstacles[1].collected);
}

// ================================================================
// Single run
// ================================================================

#[test]
fn idle_run_dies_on_first_spike_and_respawns() {
    let level = Level::from_json(SAMPLE_LEVEL).unwrap();
    let mut run = Run::new(level, SimConfig::default());

    let mut fired_trigger = false;
    let died_at = run_until(&mut run, 200, InputFrame::RELEASED, |e| {
        if matches!(e, SimEvent::TriggerFired { .. }) {
            fired_trigger = true;
        }
        matches!(e, SimEvent::Died { .. })
    })
    .expect("idle cube reaches the spike");
    assert!(fired_trigger, "pass trigger at x = 4 fired before the spike");
    assert!(matches!(run.phase(), Phase::Dead { .. }));
    assert!(run.bodies().is_empty());

    let respawned_at = run_until(&mut run, 100, InputFrame::RELEASED, |e| {
        matches!(e, SimEvent::Respawned { attempt: 2 })
    })
    .expect("respawn follows the death delay");
    assert_eq!(respawned_at, died_at + SimConfig::default().run.death_delay_ticks);
    assert_eq!(run.attempt(), 2);
    assert_eq!(run.phase(), Phase::Alive);
    assert_eq!(run.body().x, 0.0);
}

#[test]
fn death_reports_reach_the_record() {
    let level = Level::from_json(SAMPLE_LEVEL).unwrap();
    let mut record = level.completion.clone();
    let mut run = Run::new(level, SimConfig::default());

    let events = run_ticks(&mut run, 150, InputFrame::RELEASED);
    let forwarded = forward_reports(&events, &mut record);
    assert_eq!(forwarded, 1);
    assert!(record.percentage > 10 && record.percentage < 20, "{}", record.percentage);
    assert_eq!(record.coins, vec![false, false]);
}

#[test]
fn coin_run_wins_and_keeps_coin() {
    let level = Level::from_json(ONE_COIN).unwrap();
    let mut run = Run::new(level, SimConfig::default());
    let mut sink = RecordingPersistenceSink::default();

    let mut events = Vec::new();
    for _ in 0..200 {
        events.extend(run.tick(&InputFrame::RELEASED));
        if run.is_complete() {
            break;
        }
    }
    assert!(run.is_complete());
    assert!(events.contains(&SimEvent::CoinCollected { index: 0 }));
    assert!(events.iter().any(|e| matches!(e, SimEvent::Won { percentage: 100 })));

    forward_reports(&events, &mut sink);
    assert_eq!(sink.reports.len(), 1);
    assert!(sink.reports[0].won);
    assert_eq!(sink.reports[0].coins, vec![true]);
    assert_eq!(run.record().percentage, 100);
    assert!(run.record().is_coin_collected(0));

    contract_complete_is_frozen(&mut run);
}

#[test]
fn restart_after_win_plays_again() {
    let level = Level::from_json(ONE_COIN).unwrap();
    let mut run = Run::new(level, SimConfig::default());
    run_until(&mut run, 200, InputFrame::RELEASED, |e| {
        matches!(e, SimEvent::Won { .. })
    })
    .unwrap();

    run.restart();
    assert_eq!(run.phase(), Phase::Alive);
    assert_eq!(run.attempt(), 1);
    assert_eq!(run.record().percentage, 100);

    let mut render = RecordingRenderSink::default();
    run.tick(&InputFrame::RELEASED);
    render_frame(&run, &mut render);
    let (_, bodies, obstacles) = &render.frames[0];
    assert_eq!(bodies.len(), 1);
    assert!(!obstacles[0].collected, "coin state reset on restart");
}

// ================================================================
// Explorer
// ================================================================

#[test]
fn explorer_finds_a_way_over_the_spike() {
    let level = Level::from_json(ONE_SPIKE).unwrap();
    let mut explorer = Explorer::new(level, SimConfig::default());

    let won_at = run_until(&mut explorer, 400, InputFrame::RELEASED, |e| {
        matches!(e, SimEvent::ExplorationWon { .. })
    })
    .expect("some press history clears a single spike");
    assert_eq!(explorer.won_at(), Some(won_at));
    assert!(explorer.population() <= SimConfig::default().explorer.population_cap);

    for _ in 0..400 {
        if explorer.is_complete() {
            break;
        }
        explorer.tick(&InputFrame::RELEASED);
    }
    assert!(explorer.is_complete());
    assert!(explorer.branches().iter().all(|b| b.won));
    contract_complete_is_frozen(&mut explorer);
}

#[test]
fn explorer_population_respects_a_small_cap() {
    let level = Level::from_json(SAMPLE_LEVEL).unwrap();
    let mut config = SimConfig::default();
    config.explorer.population_cap = 8;
    let mut explorer = Explorer::new(level, config);

    for _ in 0..120 {
        explorer.tick(&InputFrame::RELEASED);
        assert!(explorer.population() <= 8);
    }
}

#[test]
fn explorer_is_deterministic_for_a_seed() {
    let mut a = Explorer::new(Level::from_json(SAMPLE_LEVEL).unwrap(), SimConfig::default());
    let mut b = Explorer::new(Level::from_json(SAMPLE_LEVEL).unwrap(), SimConfig::default());
    let inputs = vec![InputFrame::RELEASED; 150];
    contract_deterministic(&mut a, &mut b, &inputs);
}
