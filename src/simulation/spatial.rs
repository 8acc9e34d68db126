//! Spatial grid for neighbor search.
//!
//! Built with a counting sort over hashed cell keys, in the same stages a GPU
//! pipeline would run:
//! 1. Cell key per particle
//! 2. Count particles per bucket
//! 3. Prefix sum into bucket offsets
//! 4. Scatter particle indices into sorted order
//!
//! Queries scan the 3x3 block of cells around a point. Entries are compared by
//! their full cell coordinate, so hash collisions never produce duplicates.

use bevy::math::{IVec2, Vec2};

use crate::resources::GridParams;

/// Offsets of the 3x3 neighborhood, row by row.
const NEIGHBOR_OFFSETS: [IVec2; 9] = [
    IVec2::new(-1, -1),
    IVec2::new(0, -1),
    IVec2::new(1, -1),
    IVec2::new(-1, 0),
    IVec2::new(0, 0),
    IVec2::new(1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, 1),
    IVec2::new(1, 1),
];

/// Cell coordinate containing `position`.
#[inline]
pub fn position_to_cell(position: Vec2, cell_size: f32) -> IVec2 {
    (position / cell_size).floor().as_ivec2()
}

/// Hash a cell coordinate into a bucket. Large primes for mixing.
#[inline]
pub fn cell_to_bucket(cell: IVec2, table_size: u32) -> u32 {
    const P1: u32 = 15823;
    const P2: u32 = 9737333;
    let a = (cell.x as u32).wrapping_mul(P1);
    let b = (cell.y as u32).wrapping_mul(P2);
    a.wrapping_add(b) % table_size
}

/// Counting-sorted hashed grid over one set of positions.
#[derive(Clone, Debug, Default)]
pub struct SpatialGrid {
    params: GridParams,
    /// Cell of each particle (stage 1)
    cells: Vec<IVec2>,
    /// Bucket start offsets, `table_size + 1` entries (stage 3)
    offsets: Vec<u32>,
    /// Particle indices sorted by bucket (stage 4)
    sorted: Vec<u32>,
}

impl SpatialGrid {
    /// Build the grid for `positions`.
    pub fn build(params: GridParams, positions: &[Vec2]) -> Self {
        let mut grid = Self {
            params,
            ..Default::default()
        };
        grid.rebuild(params, positions);
        grid
    }

    /// Rebuild in place, reusing allocations.
    pub fn rebuild(&mut self, params: GridParams, positions: &[Vec2]) {
        self.params = params;
        let table_size = params.table_size.max(1);
        let buckets = table_size as usize;

        // Stage 1: cell keys
        self.cells.clear();
        self.cells
            .extend(positions.iter().map(|&p| position_to_cell(p, params.cell_size)));

        // Stage 2: counts
        let mut counts = vec![0u32; buckets];
        for &cell in &self.cells {
            counts[cell_to_bucket(cell, table_size) as usize] += 1;
        }

        // Stage 3: exclusive prefix sum, with end sentinel
        self.offsets.clear();
        self.offsets.reserve(buckets + 1);
        let mut running = 0u32;
        for &count in &counts {
            self.offsets.push(running);
            running += count;
        }
        self.offsets.push(running);

        // Stage 4: scatter in index order so the layout is deterministic
        self.sorted.clear();
        self.sorted.resize(positions.len(), 0);
        let mut cursor = self.offsets[..buckets].to_vec();
        for (i, &cell) in self.cells.iter().enumerate() {
            let bucket = cell_to_bucket(cell, table_size) as usize;
            self.sorted[cursor[bucket] as usize] = i as u32;
            cursor[bucket] += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Call `visit(j)` for every particle whose cell is in the 3x3 block around
    /// `position`. Callers still filter by distance.
    pub fn for_each_candidate(&self, position: Vec2, mut visit: impl FnMut(usize)) {
        if self.cells.is_empty() {
            return;
        }
        let table_size = self.params.table_size.max(1);
        let origin = position_to_cell(position, self.params.cell_size);

        for offset in NEIGHBOR_OFFSETS {
            // Saturated far-away cells wrap instead of overflowing
            let cell = origin.wrapping_add(offset);
            let bucket = cell_to_bucket(cell, table_size) as usize;
            let start = self.offsets[bucket] as usize;
            let end = self.offsets[bucket + 1] as usize;
            for &j in &self.sorted[start..end] {
                let j = j as usize;
                if self.cells[j] == cell {
                    visit(j);
                }
            }
        }
    }

    /// Collect candidate indices (mostly for tests and debugging).
    pub fn candidates(&self, position: Vec2) -> Vec<usize> {
        let mut out = Vec::new();
        self.for_each_candidate(position, |j| out.push(j));
        out
    }
}

/// Candidate source for the kernels: the grid, or every particle.
#[derive(Clone, Copy, Debug)]
pub enum Neighborhood<'a> {
    Grid(&'a SpatialGrid),
    All(usize),
}

impl Neighborhood<'_> {
    /// Visit every candidate neighbor of `position`, the particle itself included.
    #[inline]
    pub fn for_each_candidate(&self, position: Vec2, mut visit: impl FnMut(usize)) {
        match self {
            Neighborhood::Grid(grid) => grid.for_each_candidate(position, visit),
            Neighborhood::All(count) => (0..*count).for_each(&mut visit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_to_cell_floors_negative_coordinates() {
        assert_eq!(position_to_cell(Vec2::new(0.5, 0.5), 1.0), IVec2::ZERO);
        assert_eq!(position_to_cell(Vec2::new(1.5, 0.5), 1.0), IVec2::new(1, 0));
        assert_eq!(position_to_cell(Vec2::new(-0.1, -1.1), 1.0), IVec2::new(-1, -2));
    }

    #[test]
    fn offsets_cover_all_particles() {
        let positions: Vec<Vec2> = (0..50)
            .map(|i| Vec2::new(i as f32 * 0.13 - 3.0, (i % 7) as f32 * 0.4))
            .collect();
        let grid = SpatialGrid::build(GridParams::new(0.5, positions.len()), &positions);
        assert_eq!(*grid.offsets.last().unwrap() as usize, positions.len());
        let mut seen = grid.sorted.clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..50u32).collect::<Vec<_>>());
    }

    #[test]
    fn finds_close_and_skips_far() {
        let positions = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.1, 0.1),
            Vec2::new(5.0, 5.0),
        ];
        let grid = SpatialGrid::build(GridParams::new(1.0, positions.len()), &positions);
        let near = grid.candidates(Vec2::ZERO);
        assert!(near.contains(&0));
        assert!(near.contains(&1));
        assert!(!near.contains(&2));
    }

    #[test]
    fn no_duplicates_under_hash_collisions() {
        // A single bucket forces every cell to collide
        let positions: Vec<Vec2> = (0..9)
            .map(|i| Vec2::new((i % 3) as f32 - 1.0, (i / 3) as f32 - 1.0) * 0.9)
            .collect();
        let grid = SpatialGrid::build(GridParams { cell_size: 1.0, table_size: 1 }, &positions);
        let mut found = grid.candidates(Vec2::new(0.1, 0.1));
        let total = found.len();
        found.sort_unstable();
        found.dedup();
        assert_eq!(found.len(), total);
    }

    #[test]
    fn candidates_include_every_neighbor_within_cell_size() {
        let positions: Vec<Vec2> = (0..200)
            .map(|i| {
                let t = i as f32 * 0.731;
                Vec2::new(t.sin() * 4.0, (t * 1.37).cos() * 3.0)
            })
            .collect();
        let h = 0.6;
        let grid = SpatialGrid::build(GridParams::new(h, positions.len()), &positions);
        for (i, &p) in positions.iter().enumerate() {
            let candidates = grid.candidates(p);
            for (j, &q) in positions.iter().enumerate() {
                if p.distance(q) < h {
                    assert!(candidates.contains(&j), "particle {j} missing for {i}");
                }
            }
        }
    }

    #[test]
    fn saturated_cells_do_not_overflow() {
        let positions = vec![Vec2::new(1.0e12, -1.0e12), Vec2::ZERO];
        let grid = SpatialGrid::build(GridParams::new(0.35, positions.len()), &positions);
        assert_eq!(grid.candidates(positions[0]), vec![0]);
        assert_eq!(grid.candidates(Vec2::ZERO), vec![1]);
    }

    #[test]
    fn empty_grid_visits_nothing() {
        let grid = SpatialGrid::build(GridParams::new(1.0, 0), &[]);
        assert!(grid.is_empty());
        assert!(grid.candidates(Vec2::ZERO).is_empty());
    }
}
