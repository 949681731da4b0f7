//! MatchUp Graph construction.
//!
//! Pure functions that build the unseeded shape of a structure: its position
//! table (every position `UNASSIGNED`) and the matchUps wired together by
//! their side sources. Seeding is someone else's job; once positions are
//! filled, `DrawEngine::prepare` resolves BYEs through the graph.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use thiserror::Error;

use crate::types::{
    DrawDefinition, DrawPosition, Group, GroupId, LinkId, LinkType, MatchUp, MatchUpId,
    PositionAssignment, SideSource, Stage, Structure, StructureId, StructureKind,
};

/// Errors produced when a structure shape is impossible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("draw size {0} is not a power of two >= 2")]
    InvalidSize(u32),

    #[error("round {0} cannot be a fed round")]
    InvalidFedRound(u32),

    #[error("group {group} has {size} positions, need at least 2")]
    GroupTooSmall { group: u32, size: u32 },

    #[error("a round-robin structure needs at least one group")]
    NoGroups,
}

fn matchup_id(structure_id: &StructureId, round: u32, position: u32) -> MatchUpId {
    MatchUpId::new(format!("{structure_id}-R{round}-P{position}"))
}

fn position_source(n: u32) -> SideSource {
    SideSource::Position {
        draw_position: DrawPosition(n),
    }
}

fn winner_source(matchup_id: &MatchUpId) -> SideSource {
    SideSource::Winner {
        matchup_id: matchup_id.clone(),
    }
}

fn empty_structure(
    structure_id: StructureId,
    stage: Stage,
    kind: StructureKind,
    size: u32,
) -> Structure {
    Structure {
        structure_id,
        stage,
        stage_sequence: 1,
        kind,
        positions: (1..=size)
            .map(|n| PositionAssignment::unassigned(DrawPosition(n)))
            .collect(),
        matchups: Vec::new(),
        groups: Vec::new(),
        matchup_format: None,
    }
}

/// Builds a single-elimination bracket of `size` positions.
///
/// Round 1 pairs positions (1,2), (3,4), ...; each later round pairs the
/// winners of consecutive matchUps of the previous round.
pub fn elimination_structure(
    structure_id: StructureId,
    stage: Stage,
    size: u32,
) -> Result<Structure, TopologyError> {
    feed_in_structure(structure_id, stage, size, &[])
}

/// Builds an elimination bracket with fed rounds.
///
/// In a fed round `r`, matchUp `k` pairs a new fed position (side 1,
/// numbered after the base positions in round then slot order) with the
/// winner of matchUp `k` of round `r - 1` (side 2), so the round has as many
/// matchUps as the previous one. Rounds not listed halve as usual.
pub fn feed_in_structure(
    structure_id: StructureId,
    stage: Stage,
    base_size: u32,
    fed_rounds: &[u32],
) -> Result<Structure, TopologyError> {
    if base_size < 2 || !base_size.is_power_of_two() {
        return Err(TopologyError::InvalidSize(base_size));
    }
    let mut pending: BTreeSet<u32> = fed_rounds.iter().copied().collect();
    if let Some(&first) = pending.first().filter(|&&r| r < 2) {
        return Err(TopologyError::InvalidFedRound(first));
    }

    let mut matchups = Vec::new();
    let mut previous: Vec<MatchUpId> = Vec::new();
    for k in 1..=base_size / 2 {
        let id = matchup_id(&structure_id, 1, k);
        matchups.push(MatchUp::new(
            id.clone(),
            1,
            k,
            [position_source(2 * k - 1), position_source(2 * k)],
        ));
        previous.push(id);
    }

    let mut next_fed = base_size + 1;
    let mut round = 2;
    loop {
        let fed = pending.remove(&round);
        if !fed && previous.len() == 1 {
            break;
        }
        let mut current = Vec::new();
        if fed {
            for (k, upstream) in (1u32..).zip(previous.iter()) {
                let id = matchup_id(&structure_id, round, k);
                matchups.push(MatchUp::new(
                    id.clone(),
                    round,
                    k,
                    [position_source(next_fed), winner_source(upstream)],
                ));
                next_fed += 1;
                current.push(id);
            }
        } else {
            for (k, pair) in (1u32..).zip(previous.chunks(2)) {
                let id = matchup_id(&structure_id, round, k);
                matchups.push(MatchUp::new(
                    id.clone(),
                    round,
                    k,
                    [winner_source(&pair[0]), winner_source(&pair[1])],
                ));
                current.push(id);
            }
        }
        previous = current;
        round += 1;
    }

    if let Some(&unused) = pending.first() {
        return Err(TopologyError::InvalidFedRound(unused));
    }

    let mut structure = empty_structure(
        structure_id,
        stage,
        StructureKind::Elimination,
        next_fed - 1,
    );
    structure.matchups = matchups;
    Ok(structure)
}

/// Builds a round-robin structure with one group per entry of `group_sizes`.
///
/// Positions are numbered consecutively across groups. Each group's
/// pairings come from the circle method, so every pair of positions meets
/// exactly once and rounds are balanced.
pub fn round_robin_structure(
    structure_id: StructureId,
    stage: Stage,
    group_sizes: &[u32],
) -> Result<Structure, TopologyError> {
    if group_sizes.is_empty() {
        return Err(TopologyError::NoGroups);
    }
    if let Some((g, &size)) = (1u32..).zip(group_sizes).find(|(_, size)| **size < 2) {
        return Err(TopologyError::GroupTooSmall { group: g, size });
    }

    let total: u32 = group_sizes.iter().sum();
    let mut structure = empty_structure(
        structure_id.clone(),
        stage,
        StructureKind::RoundRobin,
        total,
    );

    let mut first = 1;
    for (g, &size) in (1u32..).zip(group_sizes) {
        let group_id = GroupId::new(format!("{structure_id}-G{g}"));
        let positions: Vec<DrawPosition> = (first..first + size).map(DrawPosition).collect();
        first += size;

        for (round, pairs) in (1u32..).zip(circle_rounds(&positions)) {
            for (slot, (a, b)) in (1u32..).zip(pairs) {
                let (a, b) = if a < b { (a, b) } else { (b, a) };
                let id = MatchUpId::new(format!("{group_id}-{a}v{b}"));
                structure.matchups.push(
                    MatchUp::new(id, round, slot, [position_source(a.0), position_source(b.0)])
                        .with_group(group_id.clone()),
                );
            }
        }
        structure.groups.push(Group {
            group_id,
            draw_positions: positions,
        });
    }
    Ok(structure)
}

/// Circle-method rounds for one group. Odd groups rest one position per
/// round.
fn circle_rounds(positions: &[DrawPosition]) -> Vec<Vec<(DrawPosition, DrawPosition)>> {
    let mut ring: Vec<Option<DrawPosition>> = positions.iter().copied().map(Some).collect();
    if ring.len() % 2 == 1 {
        ring.push(None);
    }
    let n = ring.len();
    let mut rounds = Vec::with_capacity(n - 1);
    for _ in 0..n - 1 {
        let pairs = (0..n / 2)
            .filter_map(|i| match (ring[i], ring[n - 1 - i]) {
                (Some(a), Some(b)) => Some((a, b)),
                _ => None,
            })
            .collect();
        rounds.push(pairs);
        // Keep the first seat fixed and rotate the rest.
        let last = ring.remove(n - 1);
        ring.insert(1, last);
    }
    rounds
}

/// One edge of the link graph, for schedulers that need stage ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDependency {
    pub link_id: LinkId,
    pub link_type: LinkType,
    pub source: StructureId,
    pub target: StructureId,
}

/// The link graph as source → target edges, in link order.
pub fn stage_dependencies(draw: &DrawDefinition) -> Vec<StageDependency> {
    draw.links
        .iter()
        .map(|link| StageDependency {
            link_id: link.link_id.clone(),
            link_type: link.link_type,
            source: link.source.structure_id.clone(),
            target: link.target.structure_id.clone(),
        })
        .collect()
}

/// Detects a cycle in the link graph.
///
/// Returns the structures on the cycle, or `None` if links only flow
/// forward. Propagation relies on this graph being acyclic.
pub fn detect_link_cycle(draw: &DrawDefinition) -> Option<Vec<StructureId>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut edges: HashMap<&StructureId, Vec<&StructureId>> = HashMap::new();
    for link in &draw.links {
        edges
            .entry(&link.source.structure_id)
            .or_default()
            .push(&link.target.structure_id);
    }

    fn dfs<'a>(
        node: &'a StructureId,
        edges: &HashMap<&'a StructureId, Vec<&'a StructureId>>,
        colors: &mut HashMap<&'a StructureId, Color>,
        path: &mut Vec<&'a StructureId>,
    ) -> Option<Vec<StructureId>> {
        colors.insert(node, Color::Gray);
        path.push(node);
        for &next in edges.get(node).map(Vec::as_slice).unwrap_or(&[]) {
            match colors.get(next).copied().unwrap_or(Color::White) {
                Color::Gray => {
                    let start = path.iter().position(|&p| p == next).unwrap_or(0);
                    return Some(path[start..].iter().map(|&s| s.clone()).collect());
                }
                Color::White => {
                    if let Some(cycle) = dfs(next, edges, colors, path) {
                        return Some(cycle);
                    }
                }
                Color::Black => {}
            }
        }
        path.pop();
        colors.insert(node, Color::Black);
        None
    }

    let mut colors = HashMap::new();
    for link in &draw.links {
        let start = &link.source.structure_id;
        if colors.get(start).copied().unwrap_or(Color::White) == Color::White {
            let mut path = Vec::new();
            if let Some(cycle) = dfs(start, &edges, &mut colors, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

/// Structures ordered so every link source comes before its target.
///
/// Structures off the link graph keep their draw order. Structures on a
/// cycle are appended last, in draw order.
pub fn link_order(draw: &DrawDefinition) -> Vec<StructureId> {
    let mut placed: Vec<StructureId> = Vec::with_capacity(draw.structures.len());
    let mut remaining: Vec<&StructureId> = draw.structures.iter().map(|s| &s.structure_id).collect();
    loop {
        let ready: Vec<&StructureId> = remaining
            .iter()
            .copied()
            .filter(|&sid| {
                draw.links
                    .iter()
                    .filter(|l| &l.target.structure_id == sid && &l.source.structure_id != sid)
                    .all(|l| placed.contains(&l.source.structure_id))
            })
            .collect();
        if ready.is_empty() {
            break;
        }
        remaining.retain(|sid| !ready.contains(sid));
        placed.extend(ready.into_iter().cloned());
    }
    placed.extend(remaining.into_iter().cloned());
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DrawType, Link};
    use std::collections::HashSet;

    fn sid(s: &str) -> StructureId {
        StructureId::from(s)
    }

    fn final_round(s: &Structure) -> u32 {
        s.matchups.iter().map(|m| m.round_number).max().unwrap_or(0)
    }

    fn round(s: &Structure, round_number: u32) -> Vec<&MatchUp> {
        let mut round: Vec<&MatchUp> = s.matchups.iter().filter(|m| m.round_number == round_number).collect();
        round.sort_by_key(|m| m.round_position);
        round
    }

    #[test]
    fn elimination_has_size_minus_one_matchups() {
        let s = elimination_structure(sid("main"), Stage::Main, 16).unwrap();
        assert_eq!(s.size(), 16);
        assert_eq!(s.matchups.len(), 15);
        assert_eq!(final_round(&s), 4);
        assert_eq!(round(&s, 1).len(), 8);
        assert_eq!(round(&s, 4).len(), 1);
    }

    #[test]
    fn elimination_wires_winners_pairwise() {
        let s = elimination_structure(sid("main"), Stage::Main, 8).unwrap();
        let r2 = s.matchup(&MatchUpId::from("main-R2-P2")).unwrap();
        assert_eq!(r2.sources[0].upstream(), Some(&MatchUpId::from("main-R1-P3")));
        assert_eq!(r2.sources[1].upstream(), Some(&MatchUpId::from("main-R1-P4")));
        assert_eq!(r2.draw_positions, [None, None]);
        let r1 = s.matchup(&MatchUpId::from("main-R1-P4")).unwrap();
        assert_eq!(r1.draw_positions, [Some(DrawPosition(7)), Some(DrawPosition(8))]);
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert_eq!(
            elimination_structure(sid("x"), Stage::Main, 12),
            Err(TopologyError::InvalidSize(12))
        );
        assert_eq!(
            elimination_structure(sid("x"), Stage::Main, 1),
            Err(TopologyError::InvalidSize(1))
        );
    }

    #[test]
    fn feed_in_round_adds_fed_positions() {
        let s = feed_in_structure(sid("c"), Stage::Consolation, 8, &[2]).unwrap();
        // 8 base + 4 fed positions.
        assert_eq!(s.size(), 12);
        let r2 = round(&s, 2);
        assert_eq!(r2.len(), 4);
        assert_eq!(r2[0].sources[0].draw_position(), Some(DrawPosition(9)));
        assert_eq!(r2[0].sources[1].upstream(), Some(&MatchUpId::from("c-R1-P1")));
        assert_eq!(r2[3].sources[0].draw_position(), Some(DrawPosition(12)));
        assert_eq!(round(&s, 3).len(), 2);
        assert_eq!(final_round(&s), 4);
    }

    #[test]
    fn fed_final_round() {
        let s = feed_in_structure(sid("c"), Stage::Consolation, 4, &[3]).unwrap();
        assert_eq!(s.size(), 5);
        assert_eq!(final_round(&s), 3);
        assert_eq!(round(&s, 3).len(), 1);
    }

    #[test]
    fn rejects_unreachable_fed_round() {
        assert_eq!(
            feed_in_structure(sid("c"), Stage::Consolation, 4, &[1]),
            Err(TopologyError::InvalidFedRound(1))
        );
        assert_eq!(
            feed_in_structure(sid("c"), Stage::Consolation, 4, &[5]),
            Err(TopologyError::InvalidFedRound(5))
        );
    }

    #[test]
    fn round_robin_pairs_every_position_once() {
        let s = round_robin_structure(sid("rr"), Stage::Main, &[4, 3]).unwrap();
        assert_eq!(s.size(), 7);
        assert_eq!(s.groups.len(), 2);
        // 4 choose 2 + 3 choose 2
        assert_eq!(s.matchups.len(), 6 + 3);

        for group in &s.groups {
            let mut seen = HashSet::new();
            for m in s.group_matchups(&group.group_id) {
                let [Some(a), Some(b)] = m.draw_positions else {
                    panic!("pairing without positions");
                };
                assert!(group.draw_positions.contains(&a));
                assert!(group.draw_positions.contains(&b));
                assert!(seen.insert((a, b)), "pair repeated");
            }
            let n = group.draw_positions.len();
            assert_eq!(seen.len(), n * (n - 1) / 2);
        }
    }

    #[test]
    fn round_robin_ids_name_group_and_positions() {
        let s = round_robin_structure(sid("rr"), Stage::Main, &[3]).unwrap();
        assert!(s.matchup(&MatchUpId::from("rr-G1-1v3")).is_some());
        assert_eq!(s.groups[0].group_id, GroupId::from("rr-G1"));
    }

    #[test]
    fn rejects_degenerate_groups() {
        assert_eq!(
            round_robin_structure(sid("rr"), Stage::Main, &[]),
            Err(TopologyError::NoGroups)
        );
        assert_eq!(
            round_robin_structure(sid("rr"), Stage::Main, &[4, 1]),
            Err(TopologyError::GroupTooSmall { group: 2, size: 1 })
        );
    }

    // ─── Link graph ───

    fn linked_draw(edges: &[(&str, &str)]) -> DrawDefinition {
        let mut draw = DrawDefinition::new("d", DrawType::Compass);
        for (i, (from, to)) in edges.iter().enumerate() {
            draw.links.push(Link::round(
                format!("l{i}"),
                LinkType::Loser,
                (sid(from), 1),
                sid(to),
                vec![DrawPosition(1)],
            ));
        }
        draw
    }

    #[test]
    fn dependencies_follow_link_order() {
        let draw = linked_draw(&[("q", "main"), ("main", "cons")]);
        let deps = stage_dependencies(&draw);
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].source, sid("q"));
        assert_eq!(deps[1].target, sid("cons"));
        assert!(detect_link_cycle(&draw).is_none());
    }

    #[test]
    fn detects_link_cycle() {
        let draw = linked_draw(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let cycle = detect_link_cycle(&draw).unwrap();
        assert_eq!(cycle.len(), 3);
        assert!(cycle.contains(&sid("b")));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let draw = linked_draw(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        assert!(detect_link_cycle(&draw).is_none());
    }

    #[test]
    fn link_order_puts_sources_first() {
        let mut draw = linked_draw(&[("q", "main"), ("main", "cons")]);
        for id in ["cons", "main", "q", "other"] {
            draw.structures
                .push(elimination_structure(sid(id), Stage::Main, 2).unwrap());
        }
        assert_eq!(
            link_order(&draw),
            vec![sid("q"), sid("other"), sid("main"), sid("cons")]
        );
    }
}
