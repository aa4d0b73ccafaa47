//! Lazily populated, bounded cache of [`TerrainCell`]s.
//!
//! Lookups never block. A missing or stale cell queues a [`ProbeJob`]; the director
//! advances queued jobs with [`TerrainCache::pump`] once per tick under a fixed probe
//! budget, and callers simply ask again next tick.

use std::collections::{HashMap, HashSet, VecDeque};

use engine_core::WorldQuery;
use glam::{IVec2, Vec3};

use crate::config::TerrainAnalysisConfig;
use crate::terrain::cell::{world_to_grid, TerrainCell};
use crate::terrain::probe::ProbeJob;

/// Result of a non-blocking terrain lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellLookup<'a> {
    /// Sampled within the staleness window.
    Fresh(&'a TerrainCell),
    /// Older than the staleness window; a refresh is queued or running.
    Stale(&'a TerrainCell),
    /// First sample still in progress.
    Pending,
    /// Nothing to sample here (outside the world). Treat as average terrain.
    Unknown,
}

impl<'a> CellLookup<'a> {
    /// The cell, fresh or stale.
    pub fn cell(self) -> Option<&'a TerrainCell> {
        match self {
            CellLookup::Fresh(cell) | CellLookup::Stale(cell) => Some(cell),
            CellLookup::Pending | CellLookup::Unknown => None,
        }
    }
}

#[derive(Debug)]
struct CachedCell {
    cell: TerrainCell,
    last_access: u64,
}

/// Counters of what one [`TerrainCache::pump`] call did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    pub batches: usize,
    pub probes: usize,
    pub completed: usize,
}

#[derive(Debug)]
pub struct TerrainCache {
    config: TerrainAnalysisConfig,
    cells: HashMap<IVec2, CachedCell>,
    /// Cells that produced no samples, with the time they were marked.
    unknown: HashMap<IVec2, f32>,
    in_flight: HashSet<IVec2>,
    queue: VecDeque<ProbeJob>,
    access_clock: u64,
}

impl TerrainCache {
    pub fn new(config: TerrainAnalysisConfig) -> Self {
        Self {
            config,
            cells: HashMap::new(),
            unknown: HashMap::new(),
            in_flight: HashSet::new(),
            queue: VecDeque::new(),
            access_clock: 0,
        }
    }

    pub fn config(&self) -> &TerrainAnalysisConfig {
        &self.config
    }

    /// Look up the cell under `position`, queueing a probe job if it is missing or stale.
    pub fn analyze(&mut self, position: Vec3, now: f32) -> CellLookup<'_> {
        let coord = world_to_grid(position, self.config.analysis_grid_size);
        self.access_clock += 1;
        let stamp = self.access_clock;
        let staleness = self.config.staleness_seconds;

        let stale = match self.cells.get_mut(&coord) {
            Some(entry) => {
                entry.last_access = stamp;
                Some(entry.cell.age(now) > staleness)
            }
            None => None,
        };

        match stale {
            Some(true) => {
                self.enqueue(coord);
                self.cells
                    .get(&coord)
                    .map_or(CellLookup::Pending, |e| CellLookup::Stale(&e.cell))
            }
            Some(false) => self
                .cells
                .get(&coord)
                .map_or(CellLookup::Pending, |e| CellLookup::Fresh(&e.cell)),
            None => {
                if let Some(&marked) = self.unknown.get(&coord) {
                    if now - marked <= staleness {
                        return CellLookup::Unknown;
                    }
                    self.unknown.remove(&coord);
                }
                self.enqueue(coord);
                CellLookup::Pending
            }
        }
    }

    /// Advance queued jobs in FIFO order, one bounded batch at a time.
    pub fn pump(&mut self, world: &dyn WorldQuery, now: f32) -> PumpStats {
        let mut stats = PumpStats::default();
        let staleness = self.config.staleness_seconds;
        self.unknown.retain(|_, marked| now - *marked <= staleness);
        let batch = self.config.max_concurrent_raycasts.max(1);
        while stats.batches < self.config.max_probe_batches_per_tick {
            let Some(job) = self.queue.front_mut() else {
                break;
            };
            stats.probes += job.step(world, &self.config, batch);
            stats.batches += 1;
            if job.is_complete() {
                if let Some(job) = self.queue.pop_front() {
                    self.complete(job, world, now);
                    stats.completed += 1;
                }
            }
        }
        if stats.batches > 0 {
            log::trace!(
                "terrain pump: {} batches, {} probes, {} cells done, {} queued",
                stats.batches,
                stats.probes,
                stats.completed,
                self.queue.len()
            );
        }
        stats
    }

    /// Sample the cell under `position` right away and cache it.
    pub fn analyze_now(
        &mut self,
        position: Vec3,
        world: &dyn WorldQuery,
        now: f32,
    ) -> Option<TerrainCell> {
        let coord = world_to_grid(position, self.config.analysis_grid_size);
        let mut job = match self.queue.iter().position(|j| j.coord() == coord) {
            Some(index) => self
                .queue
                .remove(index)
                .unwrap_or_else(|| ProbeJob::new(coord, &self.config)),
            None => ProbeJob::new(coord, &self.config),
        };
        self.in_flight.insert(coord);
        let batch = self.config.max_concurrent_raycasts.max(1);
        while !job.is_complete() {
            job.step(world, &self.config, batch);
        }
        self.complete(job, world, now);
        self.cells.get(&coord).map(|e| e.cell.clone())
    }

    /// Cached cell under `position`, regardless of age. Queues nothing.
    pub fn peek(&self, position: Vec3) -> Option<&TerrainCell> {
        let coord = world_to_grid(position, self.config.analysis_grid_size);
        self.cells.get(&coord).map(|e| &e.cell)
    }

    /// Movement modifier at `position`; 1.0 when nothing is known.
    pub fn movement_modifier_at(&self, position: Vec3) -> f32 {
        self.peek(position)
            .map_or(1.0, TerrainCell::effective_mobility)
    }

    pub fn is_high_ground_at(&self, position: Vec3) -> bool {
        self.peek(position).is_some_and(|c| c.is_high_ground)
    }

    pub fn provides_cover_at(&self, position: Vec3) -> bool {
        self.peek(position).is_some_and(|c| c.provides_cover)
    }

    pub fn nearest_cover_point(&self, position: Vec3) -> Option<Vec3> {
        self.peek(position)
            .and_then(|c| c.nearest_cover_point(position))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells currently remembered as having no surface.
    pub fn unknown_len(&self) -> usize {
        self.unknown.len()
    }

    pub fn queued_jobs(&self) -> usize {
        self.queue.len()
    }

    pub fn is_in_flight(&self, position: Vec3) -> bool {
        self.in_flight
            .contains(&world_to_grid(position, self.config.analysis_grid_size))
    }

    fn enqueue(&mut self, coord: IVec2) {
        if self.in_flight.insert(coord) {
            self.queue.push_back(ProbeJob::new(coord, &self.config));
        }
    }

    fn complete(&mut self, job: ProbeJob, world: &dyn WorldQuery, now: f32) {
        let coord = job.coord();
        self.in_flight.remove(&coord);
        match job.finish(world, &self.config, now) {
            Some(cell) => {
                self.unknown.remove(&coord);
                self.insert(coord, cell);
            }
            None => {
                log::debug!("terrain cell {:?} has no surface, caching as unknown", coord);
                self.cells.remove(&coord);
                self.unknown.insert(coord, now);
            }
        }
    }

    fn insert(&mut self, coord: IVec2, cell: TerrainCell) {
        if !self.cells.contains_key(&coord) {
            while self.cells.len() >= self.config.max_cached_cells.max(1) {
                let Some(oldest) = self
                    .cells
                    .iter()
                    .min_by_key(|(_, e)| e.last_access)
                    .map(|(c, _)| *c)
                else {
                    break;
                };
                self.cells.remove(&oldest);
            }
        }
        self.access_clock += 1;
        self.cells.insert(
            coord,
            CachedCell {
                cell,
                last_access: self.access_clock,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedWorld;

    fn cache() -> TerrainCache {
        TerrainCache::new(TerrainAnalysisConfig::default())
    }

    #[test]
    fn first_lookup_is_pending_then_fresh_after_pump() {
        let world = ScriptedWorld::flat(2.0);
        let mut cache = cache();
        let p = Vec3::new(1.0, 0.0, 1.0);
        assert_eq!(cache.analyze(p, 0.0), CellLookup::Pending);
        cache.pump(&world, 0.0);
        assert!(matches!(cache.analyze(p, 0.1), CellLookup::Fresh(_)));
    }

    #[test]
    fn in_flight_cell_is_not_reissued() {
        let world = ScriptedWorld::flat(2.0);
        let mut cache = cache();
        let p = Vec3::new(1.0, 0.0, 1.0);
        cache.analyze(p, 0.0);
        cache.analyze(p, 0.0);
        cache.analyze(Vec3::new(2.0, 0.0, 2.0), 0.0);
        assert_eq!(cache.queued_jobs(), 1);
        cache.pump(&world, 0.0);
        assert_eq!(world.probe_count(), 36);
    }

    #[test]
    fn stale_cell_is_served_while_refreshing() {
        let world = ScriptedWorld::flat(2.0);
        let mut cache = cache();
        let p = Vec3::new(1.0, 0.0, 1.0);
        cache.analyze_now(p, &world, 0.0);

        match cache.analyze(p, 1.5) {
            CellLookup::Stale(cell) => assert_eq!(cell.last_update_time, 0.0),
            other => panic!("expected stale, got {:?}", other),
        }
        assert!(cache.is_in_flight(p));
        assert!(matches!(cache.analyze(p, 1.6), CellLookup::Stale(_)));
        assert_eq!(cache.queued_jobs(), 1);

        cache.pump(&world, 1.7);
        match cache.analyze(p, 1.8) {
            CellLookup::Fresh(cell) => assert_eq!(cell.last_update_time, 1.7),
            other => panic!("expected fresh, got {:?}", other),
        }
    }

    #[test]
    fn cell_exactly_at_staleness_is_still_fresh() {
        let world = ScriptedWorld::flat(2.0);
        let mut cache = cache();
        let p = Vec3::new(1.0, 0.0, 1.0);
        cache.analyze_now(p, &world, 0.0);
        let staleness = cache.config().staleness_seconds;
        assert!(matches!(cache.analyze(p, staleness), CellLookup::Fresh(_)));
        assert_eq!(cache.queued_jobs(), 0);
        assert!(matches!(cache.analyze(p, staleness + 0.01), CellLookup::Stale(_)));
    }

    #[test]
    fn pump_respects_probe_budget() {
        let world = ScriptedWorld::flat(2.0);
        let mut cache = TerrainCache::new(TerrainAnalysisConfig {
            max_concurrent_raycasts: 10,
            max_probe_batches_per_tick: 2,
            ..Default::default()
        });
        let p = Vec3::new(1.0, 0.0, 1.0);
        cache.analyze(p, 0.0);
        let stats = cache.pump(&world, 0.0);
        assert_eq!(stats.probes, 20);
        assert_eq!(stats.completed, 0);
        assert_eq!(cache.analyze(p, 0.0), CellLookup::Pending);

        let stats = cache.pump(&world, 0.0);
        assert_eq!(stats.probes, 16);
        assert_eq!(stats.completed, 1);
        assert_eq!(world.probe_count(), 36);
    }

    #[test]
    fn outside_world_is_unknown_and_negatively_cached() {
        let world = ScriptedWorld::flat(2.0).bounded(20.0);
        let mut cache = cache();
        let far = Vec3::new(500.0, 0.0, 500.0);
        cache.analyze(far, 0.0);
        cache.pump(&world, 0.0);
        let probes = world.probe_count();

        assert_eq!(cache.analyze(far, 0.5), CellLookup::Unknown);
        assert_eq!(cache.queued_jobs(), 0);
        cache.pump(&world, 0.5);
        assert_eq!(world.probe_count(), probes);
        assert_eq!(cache.movement_modifier_at(far), 1.0);

        // Marker expires after one staleness period.
        assert_eq!(cache.analyze(far, 1.2), CellLookup::Pending);
    }

    #[test]
    fn expired_unknown_markers_are_swept_by_pump() {
        let world = ScriptedWorld::flat(2.0).bounded(20.0);
        let mut cache = cache();
        for i in 0..4 {
            cache.analyze(Vec3::new(500.0 + i as f32 * 10.0, 0.0, 500.0), 0.0);
        }
        while cache.queued_jobs() > 0 {
            cache.pump(&world, 0.0);
        }
        assert_eq!(cache.unknown_len(), 4);

        // Nobody asks about those cells again; the markers still go.
        cache.pump(&world, 0.5);
        assert_eq!(cache.unknown_len(), 4);
        cache.pump(&world, 1.5);
        assert_eq!(cache.unknown_len(), 0);
    }

    #[test]
    fn least_recently_accessed_cell_is_evicted() {
        let world = ScriptedWorld::flat(2.0);
        let mut cache = TerrainCache::new(TerrainAnalysisConfig {
            max_cached_cells: 2,
            ..Default::default()
        });
        let a = Vec3::new(1.0, 0.0, 1.0);
        let b = Vec3::new(6.0, 0.0, 1.0);
        let c = Vec3::new(11.0, 0.0, 1.0);
        cache.analyze_now(a, &world, 0.0);
        cache.analyze_now(b, &world, 0.0);
        // Touch `a` so `b` becomes the eviction victim.
        cache.analyze(a, 0.1);
        cache.analyze_now(c, &world, 0.2);

        assert_eq!(cache.len(), 2);
        assert!(cache.peek(a).is_some());
        assert!(cache.peek(b).is_none());
        assert!(cache.peek(c).is_some());
    }

    #[test]
    fn peeks_report_cover_and_high_ground() {
        let world = ScriptedWorld::flat(2.0).with_cover(Vec3::new(3.0, 2.0, 3.0), 3.0);
        let mut cache = cache();
        let p = Vec3::new(1.0, 0.0, 1.0);
        assert!(!cache.provides_cover_at(p));
        cache.analyze_now(p, &world, 0.0);
        assert!(cache.provides_cover_at(p));
        assert!(!cache.is_high_ground_at(p));
        assert_eq!(cache.nearest_cover_point(p), Some(Vec3::new(3.0, 2.0, 3.0)));
    }
}
