//! Shared draw fixtures and arbitrary generators for property-based testing.

use proptest::prelude::*;

use crate::cascade::DrawEngine;
use crate::commands::Command;
use crate::config::EngineConfig;
use crate::state::topology::{elimination_structure, feed_in_structure, round_robin_structure};
use crate::types::{
    DrawDefinition, DrawPosition, DrawType, Entry, EntryStatus, FeedProfile, Link, LinkCondition,
    LinkType, MatchUp, MatchUpFormat, MatchUpId, MatchUpStatus, Occupant, OutcomePayload,
    ParticipantId, Score, SetScore, Side, Stage, Structure, StructureId,
};

pub const TEST_SEED: u64 = 7;

/// Alternate entries present in every fixture draw.
pub const ALTERNATES: [&str; 2] = ["ALT1", "ALT2"];

// ─── Ids ───

pub fn sid(s: &str) -> StructureId {
    StructureId::from(s)
}

pub fn mid(s: &str) -> MatchUpId {
    MatchUpId::from(s)
}

pub fn dp(n: u32) -> DrawPosition {
    DrawPosition(n)
}

// ─── Engine and results ───

pub fn test_engine() -> DrawEngine {
    DrawEngine::new(EngineConfig::default().with_random_seed(TEST_SEED))
}

pub fn prepared(draw: DrawDefinition) -> DrawDefinition {
    test_engine().prepare(&draw).unwrap()
}

pub fn score(text: &str) -> Score {
    Score::parse(text, &MatchUpFormat::default()).unwrap()
}

pub fn won_by(side: Side, text: &str) -> OutcomePayload {
    OutcomePayload::completed(side, score(text))
}

pub fn matchup<'a>(draw: &'a DrawDefinition, id: &str) -> &'a MatchUp {
    draw.find_matchup(&mid(id)).map(|(_, m)| m).unwrap()
}

pub fn occupant<'a>(draw: &'a DrawDefinition, structure: &str, n: u32) -> &'a Occupant {
    draw.structure(&sid(structure))
        .and_then(|s| s.occupant(dp(n)))
        .unwrap()
}

/// A straight-sets win for whichever side holds `winner`.
pub fn win_for(draw: &DrawDefinition, id: &str, winner: u32) -> OutcomePayload {
    let side = matchup(draw, id).side_of(dp(winner)).unwrap();
    match side {
        Side::One => won_by(side, "6-2 6-2"),
        Side::Two => won_by(side, "2-6 2-6"),
    }
}

// ─── Draw fixtures ───

/// Places participant `P{n}` at every position except `byes`.
pub fn seed_positions(structure: &mut Structure, byes: &[u32]) {
    for row in &mut structure.positions {
        let n = row.draw_position.0;
        row.occupant = if byes.contains(&n) {
            Occupant::Bye
        } else {
            Occupant::participant(format!("P{n}"))
        };
    }
}

fn with_entries(mut draw: DrawDefinition) -> DrawDefinition {
    let mut placed: Vec<ParticipantId> = draw
        .structures
        .iter()
        .flat_map(|s| s.positions.iter())
        .filter_map(|row| row.occupant.participant_id().cloned())
        .collect();
    placed.sort();
    placed.dedup();
    draw.entries = placed
        .into_iter()
        .map(|p| Entry::new(p, EntryStatus::DirectAcceptance))
        .chain(ALTERNATES.iter().map(|a| Entry::new(*a, EntryStatus::Alternate)))
        .collect();
    draw
}

fn seeded_elimination(id: &str, stage: Stage, size: u32, byes: &[u32]) -> Structure {
    let mut structure = elimination_structure(sid(id), stage, size).unwrap();
    seed_positions(&mut structure, byes);
    structure
}

/// A single-elimination draw with one structure, `main`. Not prepared.
pub fn elimination_draw(size: u32, byes: &[u32]) -> DrawDefinition {
    let mut draw = DrawDefinition::new("draw-1", DrawType::SingleElimination);
    draw.structures
        .push(seeded_elimination("main", Stage::Main, size, byes));
    with_entries(draw)
}

/// First-match loser consolation: losers of their first matchUp in `main`,
/// round 1 or round 2 after a BYE, fill the empty `cons` bracket.
pub fn fmlc_draw(size: u32, byes: &[u32]) -> DrawDefinition {
    let mut draw = DrawDefinition::new("draw-1", DrawType::FirstMatchLoserConsolation);
    draw.structures
        .push(seeded_elimination("main", Stage::Main, size, byes));
    draw.structures
        .push(elimination_structure(sid("cons"), Stage::Consolation, size / 2).unwrap());

    let targets: Vec<DrawPosition> = (1..=size / 2).map(DrawPosition).collect();
    for round in [1, 2] {
        draw.links.push(
            Link::round(
                format!("fmlc-r{round}"),
                LinkType::Loser,
                (sid("main"), round),
                sid("cons"),
                targets.clone(),
            )
            .with_condition(LinkCondition::FirstMatchUp),
        );
    }
    with_entries(draw)
}

/// Feed-in consolation: round 1 losers of an 8-draw fill `cons` positions
/// 1-4, round 2 losers are fed into positions 5-6 with `profile`.
pub fn feed_in_draw(profile: FeedProfile) -> DrawDefinition {
    let mut draw = DrawDefinition::new("draw-1", DrawType::FeedInChampionship);
    draw.structures
        .push(seeded_elimination("main", Stage::Main, 8, &[]));
    draw.structures
        .push(feed_in_structure(sid("cons"), Stage::Consolation, 4, &[2]).unwrap());
    draw.links.push(Link::round(
        "fic-r1",
        LinkType::Loser,
        (sid("main"), 1),
        sid("cons"),
        (1..=4).map(DrawPosition).collect(),
    ));
    draw.links.push(
        Link::round(
            "fic-r2",
            LinkType::Loser,
            (sid("main"), 2),
            sid("cons"),
            vec![dp(5), dp(6)],
        )
        .with_feed_profile(profile),
    );
    with_entries(draw)
}

/// A qualifying bracket whose winner takes the `Qualifier` placeholder at
/// position 1 of `main`.
pub fn qualifying_draw(qualifying_size: u32, main_size: u32) -> DrawDefinition {
    let mut draw = DrawDefinition::new("draw-1", DrawType::SingleElimination);
    let mut qualifying = elimination_structure(sid("q"), Stage::Qualifying, qualifying_size).unwrap();
    for row in &mut qualifying.positions {
        row.occupant = Occupant::participant(format!("Q{}", row.draw_position.0));
    }
    let mut main = seeded_elimination("main", Stage::Main, main_size, &[]);
    main.positions[0].occupant = Occupant::Qualifier;
    draw.structures.push(qualifying);
    draw.structures.push(main);

    let final_round = qualifying_size.trailing_zeros();
    draw.links.push(Link::round(
        "q-main",
        LinkType::Position,
        (sid("q"), final_round),
        sid("main"),
        vec![dp(1)],
    ));
    with_entries(draw)
}

/// A round-robin draw with one structure, `rr`, fully seeded.
pub fn round_robin_draw(group_sizes: &[u32]) -> DrawDefinition {
    let mut draw = DrawDefinition::new("draw-1", DrawType::RoundRobin);
    let mut structure = round_robin_structure(sid("rr"), Stage::Main, group_sizes).unwrap();
    seed_positions(&mut structure, &[]);
    draw.structures.push(structure);
    with_entries(draw)
}

/// `rr` groups feeding an empty `playoff` bracket through one RANGED link
/// carrying `finishing_positions` into every playoff position.
pub fn round_robin_playoff(
    group_sizes: &[u32],
    finishing_positions: Vec<u32>,
    playoff_size: u32,
    profile: FeedProfile,
) -> DrawDefinition {
    let mut draw = round_robin_draw(group_sizes);
    draw.draw_type = DrawType::RoundRobinWithPlayoff;
    let mut playoff = elimination_structure(sid("playoff"), Stage::Main, playoff_size).unwrap();
    playoff.stage_sequence = 2;
    draw.structures.push(playoff);
    draw.links.push(
        Link::ranged(
            "rr-playoff",
            sid("rr"),
            finishing_positions,
            sid("playoff"),
            (1..=playoff_size).map(DrawPosition).collect(),
        )
        .with_feed_profile(profile),
    );
    draw
}

/// Every matchUp of a round-robin group played, the lower position always
/// winning.
pub fn complete_group(engine: &DrawEngine, mut draw: DrawDefinition, group: &str) -> DrawDefinition {
    let ids: Vec<(MatchUpId, DrawPosition)> = draw
        .structures
        .iter()
        .flat_map(|s| s.matchups.iter())
        .filter(|m| m.group_id.as_ref().is_some_and(|g| g.as_str() == group))
        .filter_map(|m| {
            let lower = m.draw_positions.iter().flatten().min().copied()?;
            Some((m.matchup_id.clone(), lower))
        })
        .collect();
    for (id, winner) in ids {
        let outcome = win_for(&draw, id.as_str(), winner.0);
        draw = engine.set_matchup_status(&draw, id, outcome).unwrap().draw;
    }
    draw
}

// ─── Strategies ───

pub fn arb_structure_id() -> impl Strategy<Value = StructureId> {
    "[a-z][a-z0-9-]{0,11}".prop_map(StructureId::new)
}

pub fn arb_matchup_id() -> impl Strategy<Value = MatchUpId> {
    "[a-z][a-z0-9-]{0,19}".prop_map(MatchUpId::new)
}

pub fn arb_participant_id() -> impl Strategy<Value = ParticipantId> {
    "[A-Z][A-Za-z0-9]{0,9}".prop_map(ParticipantId::new)
}

pub fn arb_draw_position() -> impl Strategy<Value = DrawPosition> {
    (1u32..=128).prop_map(DrawPosition)
}

pub fn arb_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::One), Just(Side::Two)]
}

pub fn arb_status() -> impl Strategy<Value = MatchUpStatus> {
    prop_oneof![
        Just(MatchUpStatus::ToBePlayed),
        Just(MatchUpStatus::Bye),
        Just(MatchUpStatus::Completed),
        Just(MatchUpStatus::Walkover),
        Just(MatchUpStatus::Defaulted),
        Just(MatchUpStatus::Retired),
        Just(MatchUpStatus::Abandoned),
        Just(MatchUpStatus::DoubleWalkover),
        Just(MatchUpStatus::DoubleDefault),
    ]
}

pub fn arb_score() -> impl Strategy<Value = Score> {
    prop::collection::vec((0u32..=7, 0u32..=7), 1..=3).prop_map(|sets| {
        Score::new(
            (1u32..)
                .zip(sets)
                .map(|(n, (a, b))| SetScore::games(n, a, b))
                .collect(),
        )
    })
}

pub fn arb_outcome_payload() -> impl Strategy<Value = OutcomePayload> {
    (
        proptest::option::of(arb_status()),
        proptest::option::of(arb_side()),
        proptest::option::of(arb_score()),
    )
        .prop_map(|(status, winning_side, score)| OutcomePayload {
            status,
            winning_side,
            score,
        })
}

pub fn arb_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        (arb_matchup_id(), arb_outcome_payload()).prop_map(|(matchup_id, outcome)| {
            Command::SetMatchUpStatus {
                matchup_id,
                outcome,
            }
        }),
        (arb_structure_id(), arb_draw_position()).prop_map(|(structure_id, draw_position)| {
            Command::AssignBye {
                structure_id,
                draw_position,
            }
        }),
        (arb_structure_id(), arb_draw_position(), arb_participant_id()).prop_map(
            |(structure_id, draw_position, participant_id)| Command::AssignAlternate {
                structure_id,
                draw_position,
                participant_id,
            }
        ),
        (
            arb_structure_id(),
            arb_draw_position(),
            proptest::option::of(1u32..=8)
        )
            .prop_map(|(structure_id, draw_position, sub_order)| Command::SetSubOrder {
                structure_id,
                draw_position,
                sub_order,
            }),
    ]
}

/// A result a scorer might enter for one side or both.
#[derive(Debug, Clone, Copy)]
pub enum ResultAction {
    Win(Side),
    Walkover(Side),
    DoubleWalkover,
    Clear,
}

impl ResultAction {
    pub fn payload(self) -> OutcomePayload {
        match self {
            ResultAction::Win(Side::One) => won_by(Side::One, "6-3 6-4"),
            ResultAction::Win(Side::Two) => won_by(Side::Two, "3-6 4-6"),
            ResultAction::Walkover(side) => OutcomePayload::winner(MatchUpStatus::Walkover, side),
            ResultAction::DoubleWalkover => OutcomePayload::status(MatchUpStatus::DoubleWalkover),
            ResultAction::Clear => OutcomePayload::clear(),
        }
    }
}

pub fn arb_result_action() -> impl Strategy<Value = ResultAction> {
    prop_oneof![
        4 => arb_side().prop_map(ResultAction::Win),
        1 => arb_side().prop_map(ResultAction::Walkover),
        1 => Just(ResultAction::DoubleWalkover),
        1 => Just(ResultAction::Clear),
    ]
}

/// A subset of `[1, size]` to seed as BYEs.
pub fn arb_byes(size: u32) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::btree_set(1..=size, 0..(size as usize / 2))
        .prop_map(|set| set.into_iter().collect())
}
