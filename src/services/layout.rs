//! Placering av noder i fadderträdet
//!
//! Rena funktioner utan databas: nivåindelning, jämn fördelning,
//! begränsning till ritytan och kollisionsfri placering av nya noder.

use std::collections::{HashMap, HashSet, VecDeque};

pub const NODE_WIDTH: f32 = 150.0;
pub const NODE_HEIGHT: f32 = 50.0;
pub const PADDING: f32 = 20.0;
pub const LEVEL_SPACING: f32 = 150.0;
pub const COLLISION_STEP: f32 = 50.0;
pub const MAX_ATTEMPTS: usize = 100;

/// Ritytans storlek
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

impl Canvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Största tillåtna y för en nods övre kant
    pub fn max_y(&self) -> f32 {
        (self.height - NODE_HEIGHT - PADDING).max(0.0)
    }
}

/// Begränsa en position till ritytan: `0 ≤ x`, `0 ≤ y ≤ höjd − nodhöjd − marginal`
pub fn clamp_position(x: f32, y: f32, canvas: Canvas) -> (f32, f32) {
    let x = if x.is_finite() { x.max(0.0) } else { 0.0 };
    let y = if y.is_finite() { y.clamp(0.0, canvas.max_y()) } else { 0.0 };
    (x, y)
}

/// Tilldela varje nod en nivå (0 = rot).
///
/// Rötter är noder utan big. Noder som inte nås från någon rot (cykler)
/// får nivå 0 och sprider sina nivåer på samma sätt. Varje nod besöks en
/// gång och antalet steg är begränsat till antalet noder.
pub fn assign_levels(nodes: &[i64], edges: &[(i64, i64)]) -> HashMap<i64, usize> {
    let known: HashSet<i64> = nodes.iter().copied().collect();

    let mut littles: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut has_big: HashSet<i64> = HashSet::new();
    for &(big, little) in edges {
        if !known.contains(&big) || !known.contains(&little) || big == little {
            continue;
        }
        littles.entry(big).or_default().push(little);
        has_big.insert(little);
    }

    let mut levels: HashMap<i64, usize> = HashMap::with_capacity(nodes.len());
    let mut queue: VecDeque<i64> = VecDeque::new();
    let mut budget = nodes.len();

    let roots = nodes.iter().copied().filter(|id| !has_big.contains(id));
    let rest = nodes.iter().copied();

    for seed in roots.chain(rest) {
        if levels.contains_key(&seed) {
            continue;
        }
        levels.insert(seed, 0);
        queue.push_back(seed);

        while let Some(id) = queue.pop_front() {
            if budget == 0 {
                break;
            }
            budget -= 1;

            let level = levels.get(&id).copied().unwrap_or(0);
            for &child in littles.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
                if !levels.contains_key(&child) {
                    levels.insert(child, level + 1);
                    queue.push_back(child);
                }
            }
        }
    }

    levels
}

/// Beräkna nya positioner: nivåer uppifrån och ned, noderna på varje nivå
/// jämnt fördelade över ritytans bredd.
pub fn auto_layout(nodes: &[i64], edges: &[(i64, i64)], canvas: Canvas) -> Vec<(i64, f32, f32)> {
    let levels = assign_levels(nodes, edges);

    let mut by_level: Vec<Vec<i64>> = Vec::new();
    for &id in nodes {
        let level = levels.get(&id).copied().unwrap_or(0);
        if by_level.len() <= level {
            by_level.resize_with(level + 1, Vec::new);
        }
        by_level[level].push(id);
    }

    // Djupa träd trycks ihop så att varje nivå får en egen rad
    let spacing = match by_level.len() {
        0 | 1 => LEVEL_SPACING,
        n => LEVEL_SPACING.min((canvas.max_y() - PADDING).max(0.0) / (n - 1) as f32),
    };

    let mut positions = Vec::with_capacity(nodes.len());
    for (level, ids) in by_level.iter().enumerate() {
        let slot = canvas.width / (ids.len() as f32 + 1.0);
        let y = PADDING + level as f32 * spacing;
        for (i, &id) in ids.iter().enumerate() {
            let x = slot * (i as f32 + 1.0) - NODE_WIDTH / 2.0;
            let (x, y) = clamp_position(x, y, canvas);
            positions.push((id, x, y));
        }
    }

    positions
}

fn overlaps(a: (f32, f32), b: (f32, f32)) -> bool {
    (a.0 - b.0).abs() < NODE_WIDTH && (a.1 - b.1).abs() < NODE_HEIGHT
}

/// Hitta en plats som inte överlappar befintliga noder.
///
/// Startpositionen prövas först, därefter höger, ned, vänster och upp i
/// steg om 50 px med växande avstånd. Efter `MAX_ATTEMPTS` försök används
/// den sista kandidaten även om den överlappar.
pub fn place_without_collision(start: (f32, f32), occupied: &[(f32, f32)], canvas: Canvas) -> (f32, f32) {
    const DIRECTIONS: [(f32, f32); 4] = [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)];

    let mut candidate = clamp_position(start.0, start.1, canvas);
    for attempt in 0..MAX_ATTEMPTS {
        if attempt > 0 {
            let step = attempt - 1;
            let (dx, dy) = DIRECTIONS[step % 4];
            let distance = COLLISION_STEP * (step / 4 + 1) as f32;
            candidate = clamp_position(start.0 + dx * distance, start.1 + dy * distance, canvas);
        }
        if !occupied.iter().any(|&o| overlaps(candidate, o)) {
            return candidate;
        }
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> Canvas {
        Canvas::new(1200.0, 800.0)
    }

    #[test]
    fn test_levels_follow_edges() {
        let levels = assign_levels(&[1, 2, 3, 4], &[(1, 2), (2, 3)]);
        assert_eq!(levels[&1], 0);
        assert_eq!(levels[&2], 1);
        assert_eq!(levels[&3], 2);
        assert_eq!(levels[&4], 0);
    }

    #[test]
    fn test_cycle_terminates_with_levels_for_all() {
        // 1 -> 2 -> 3 -> 1 och en svans 3 -> 4
        let nodes = [1, 2, 3, 4];
        let levels = assign_levels(&nodes, &[(1, 2), (2, 3), (3, 1), (3, 4)]);

        assert_eq!(levels.len(), nodes.len());
        for id in nodes {
            assert!(levels[&id] < nodes.len());
        }
    }

    #[test]
    fn test_edges_to_unknown_nodes_are_ignored() {
        let levels = assign_levels(&[1], &[(1, 99), (98, 1)]);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[&1], 0);
    }

    #[test]
    fn test_auto_layout_spreads_levels() {
        let positions = auto_layout(&[1, 2, 3], &[(1, 2), (1, 3)], canvas());
        let pos: HashMap<i64, (f32, f32)> = positions.iter().map(|&(id, x, y)| (id, (x, y))).collect();

        assert_eq!(pos[&1], (600.0 - NODE_WIDTH / 2.0, PADDING));
        assert_eq!(pos[&2].1, PADDING + LEVEL_SPACING);
        assert_eq!(pos[&3].1, PADDING + LEVEL_SPACING);
        assert!(pos[&2].0 < pos[&3].0);
    }

    #[test]
    fn test_auto_layout_stays_inside_canvas() {
        let nodes: Vec<i64> = (1..=10).collect();
        let edges: Vec<(i64, i64)> = nodes.windows(2).map(|w| (w[0], w[1])).collect();
        let small = Canvas::new(400.0, 300.0);

        for (_, x, y) in auto_layout(&nodes, &edges, small) {
            assert!(x >= 0.0);
            assert!((0.0..=small.max_y()).contains(&y));
        }
    }

    #[test]
    fn test_clamp_position() {
        assert_eq!(clamp_position(-10.0, -5.0, canvas()), (0.0, 0.0));
        assert_eq!(clamp_position(50.0, 10_000.0, canvas()), (50.0, 800.0 - NODE_HEIGHT - PADDING));
        assert_eq!(clamp_position(f32::NAN, 10.0, canvas()), (0.0, 10.0));
    }

    #[test]
    fn test_place_without_collision() {
        assert_eq!(place_without_collision((100.0, 100.0), &[], canvas()), (100.0, 100.0));

        let occupied = [(100.0, 100.0)];
        let (x, y) = place_without_collision((100.0, 100.0), &occupied, canvas());
        assert!(!overlaps((x, y), occupied[0]));
    }

    #[test]
    fn test_place_is_clamped_to_canvas() {
        let tiny = Canvas::new(100.0, NODE_HEIGHT + PADDING);
        let occupied = [(0.0, 0.0)];
        // Bara y = 0 ryms, så endast kandidater åt höger kan bli fria
        let (x, y) = place_without_collision((0.0, 0.0), &occupied, tiny);
        assert_eq!(y, 0.0);
        assert!(x >= NODE_WIDTH);
    }

    #[test]
    fn test_deep_tree_gets_one_row_per_level() {
        let nodes: Vec<i64> = (1..=10).collect();
        let edges: Vec<(i64, i64)> = nodes.windows(2).map(|w| (w[0], w[1])).collect();
        let small = Canvas::new(400.0, 300.0);

        let mut ys: Vec<f32> = auto_layout(&nodes, &edges, small).iter().map(|&(_, _, y)| y).collect();
        ys.sort_by(f32::total_cmp);
        ys.dedup();

        assert_eq!(ys.len(), nodes.len());
        assert!(ys.iter().all(|y| (0.0..=small.max_y()).contains(y)));
    }

    #[test]
    fn test_place_falls_back_to_last_candidate() {
        // Endast y = 0 ryms och varje x längs raden är upptagen
        let tiny = Canvas::new(100.0, NODE_HEIGHT + PADDING);
        let occupied: Vec<(f32, f32)> = (0..=40).map(|i| (i as f32 * COLLISION_STEP, 0.0)).collect();

        let placed = place_without_collision((600.0, 0.0), &occupied, tiny);

        // Försök 100 går åt vänster 25 steg och hamnar mot kanten
        assert_eq!(placed, (0.0, 0.0));
        assert!(occupied.iter().any(|&o| overlaps(placed, o)));
    }
}
