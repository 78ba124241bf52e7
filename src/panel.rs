use crate::attack::{
    AmbientPulses, AttackGenerator, AttackRenderer, EventTimings, LaunchOutcome, ALERT_TIERS,
};
use crate::config::MapConfig;
use crate::data::places::{city_pool, region_countries, FOCUS_REGIONS};
use crate::data::{LoadStatus, WorldGeometry, WorldLoader};
use crate::hash::{RandomSource, SimRng};
use crate::map::{Atlas, GeoPath, MapLayers, MapRenderer, Projection, ScreenMapping, ViewportController};
use crate::scene::{Millis, Scene};
use crate::timer::{TimerId, TimerQueue};
use glam::DVec2;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Lifecycle of the map panel.
///
/// A failed geometry load never leaves `Loading`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelState {
    Loading,
    Ready,
    TornDown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerTask {
    GeneratorTick,
    PulseStart(usize),
}

/// Running counters shown in the status bar
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PanelStats {
    pub ticks: u64,
    pub launched: u64,
    pub dropped: u64,
}

/// Everything that only exists once geometry has arrived
struct Mounted {
    projection: Projection,
    atlas: Atlas,
    generator: AttackGenerator,
    pulses: AmbientPulses,
    pulse_timers: Vec<TimerId>,
    tick_timer: TimerId,
}

/// The attack map: geometry, viewport, simulation and scene under one owner.
///
/// Time only moves when the caller passes it to `update`, so the panel can
/// be driven by a terminal loop or by a simulated clock in tests.
pub struct MapPanel {
    config: MapConfig,
    state: PanelState,
    loader: WorldLoader,
    scene: Scene,
    timers: TimerQueue<TimerTask>,
    viewport: ViewportController,
    rng: Box<dyn RandomSource>,
    attacks: AttackRenderer,
    map_renderer: MapRenderer,
    mounted: Option<Mounted>,
    stats: PanelStats,
    now: Millis,
}

impl MapPanel {
    pub fn new(config: MapConfig, loader: WorldLoader) -> Self {
        let rng: Box<dyn RandomSource> = match config.seed {
            Some(seed) => Box::new(SimRng::new(seed)),
            None => Box::new(SimRng::from_time()),
        };
        Self::with_rng(config, loader, rng)
    }

    pub fn with_rng(config: MapConfig, loader: WorldLoader, rng: Box<dyn RandomSource>) -> Self {
        let [min_zoom, max_zoom] = config.scale_bounds;
        let mut map_renderer = MapRenderer::new();
        map_renderer.show_labels = config.show_labels;
        Self {
            attacks: AttackRenderer::new(event_timings(&config)),
            viewport: ViewportController::new(min_zoom, max_zoom),
            state: PanelState::Loading,
            scene: Scene::new(),
            timers: TimerQueue::new(),
            mounted: None,
            stats: PanelStats::default(),
            now: 0.0,
            config,
            loader,
            rng,
            map_renderer,
        }
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn stats(&self) -> PanelStats {
        self.stats
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn load_status(&self) -> LoadStatus {
        self.loader.status()
    }

    pub fn atlas(&self) -> Option<&Atlas> {
        self.mounted.as_ref().map(|m| &m.atlas)
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.mounted.as_ref().map(|m| &m.projection)
    }

    pub fn generator(&self) -> Option<&AttackGenerator> {
        self.mounted.as_ref().map(|m| &m.generator)
    }

    pub fn ambient_markers(&self) -> usize {
        self.mounted.as_ref().map_or(0, |m| m.pulses.len())
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Advance the panel clock to `now`.
    ///
    /// Mounts the geometry once it arrives, fires due timers, then steps
    /// every animation so finished elements are gone before the next draw.
    pub fn update(&mut self, now: Millis) {
        if self.state == PanelState::TornDown {
            return;
        }
        self.now = now;

        if self.state == PanelState::Loading {
            match self.loader.poll() {
                Some(world) => self.mount(world, now),
                None => return,
            }
        }

        for (_, task) in self.timers.due(now) {
            match task {
                TimerTask::GeneratorTick => self.tick(now),
                TimerTask::PulseStart(index) => {
                    if let Some(m) = &self.mounted {
                        m.pulses.start_pulse(&mut self.scene, index, self.rng.as_mut(), now);
                    }
                }
            }
        }

        let completions = self.scene.advance(now);
        if let Some(m) = &self.mounted {
            for completion in &completions {
                m.pulses.on_completion(&mut self.scene, completion, self.rng.as_mut());
            }
        }
    }

    fn mount(&mut self, world: WorldGeometry, now: Millis) {
        let projection = Projection::fitted(self.config.width, self.config.height, self.config.projection_scale);
        let atlas = Atlas::build(&world, &GeoPath::new(projection));
        let focus = region_countries(&self.config.region_filter);
        let generator = AttackGenerator::new(
            AttackGenerator::resolve_hotspots(&atlas, &projection, &focus),
            city_pool(self.config.show_all_cities),
            self.config.high_intensity_ratio,
            self.config.max_burst,
        );
        let tick_timer = self.timers.set_interval(now, self.config.tick_ms(), TimerTask::GeneratorTick);

        info!(
            countries = atlas.len(),
            points = atlas.point_count(),
            hotspots = generator.hotspots().len(),
            tick_ms = self.config.tick_ms(),
            "map ready"
        );

        self.mounted = Some(Mounted {
            projection,
            atlas,
            generator,
            pulses: AmbientPulses::default(),
            pulse_timers: Vec::new(),
            tick_timer,
        });
        self.state = PanelState::Ready;

        if self.config.show_ambient_pulses {
            self.seed_pulses(now);
        }
    }

    fn tick(&mut self, now: Millis) {
        let Some(m) = &self.mounted else {
            return;
        };
        self.stats.ticks += 1;
        for event in m.generator.tick(self.rng.as_mut()) {
            match self.attacks.launch(&mut self.scene, &m.projection, &event, now) {
                LaunchOutcome::Drawn { .. } => self.stats.launched += 1,
                LaunchOutcome::Dropped(_) => self.stats.dropped += 1,
            }
        }
    }

    fn seed_pulses(&mut self, now: Millis) {
        let Some(m) = &mut self.mounted else {
            return;
        };
        let focus = region_countries(&self.config.region_filter);
        let boxes: Vec<_> = m
            .atlas
            .shapes
            .iter()
            .filter(|s| focus.is_empty() || s.code.is_some_and(|c| focus.contains(&c)))
            .map(|s| s.scatter_box())
            .collect();

        m.pulses = AmbientPulses::seed(&mut self.scene, &boxes, &ALERT_TIERS, self.rng.as_mut());
        m.pulse_timers = m
            .pulses
            .start_delays()
            .map(|(index, delay)| self.timers.set_timeout(now, delay, TimerTask::PulseStart(index)))
            .collect();
    }

    fn clear_pulses(&mut self) {
        let Some(m) = &mut self.mounted else {
            return;
        };
        for id in m.pulses.element_ids() {
            self.scene.remove(id);
        }
        for timer in m.pulse_timers.drain(..) {
            self.timers.clear(timer);
        }
        m.pulses = AmbientPulses::default();
    }

    pub fn toggle_labels(&mut self) -> bool {
        self.config.show_labels = !self.config.show_labels;
        self.map_renderer.show_labels = self.config.show_labels;
        self.config.show_labels
    }

    /// Switch between the core and extended city pools
    pub fn toggle_cities(&mut self) -> bool {
        self.config.show_all_cities = !self.config.show_all_cities;
        if let Some(m) = &mut self.mounted {
            m.generator.set_cities(city_pool(self.config.show_all_cities));
        }
        self.config.show_all_cities
    }

    /// Flip between normal and fast speed; replaces the tick interval
    pub fn toggle_speed(&mut self) {
        self.config.speed = self.config.speed.toggled();
        self.attacks.set_timings(event_timings(&self.config));
        if self.state == PanelState::TornDown {
            return;
        }
        if let Some(m) = &mut self.mounted {
            self.timers.clear(m.tick_timer);
            m.tick_timer = self
                .timers
                .set_interval(self.now, self.config.tick_ms(), TimerTask::GeneratorTick);
        }
        debug!(speed = ?self.config.speed, tick_ms = self.config.tick_ms(), "speed changed");
    }

    /// Cycle between every region and the focus regions
    pub fn toggle_region(&mut self) {
        let filter = if self.config.region_filter.is_empty() {
            FOCUS_REGIONS.iter().map(|r| r.to_string()).collect()
        } else {
            BTreeSet::new()
        };
        self.set_region_filter(filter);
    }

    pub fn set_region_filter(&mut self, filter: BTreeSet<String>) {
        self.config.region_filter = filter;
        if self.state != PanelState::Ready {
            return;
        }
        let focus = region_countries(&self.config.region_filter);
        if let Some(m) = &mut self.mounted {
            let hotspots = AttackGenerator::resolve_hotspots(&m.atlas, &m.projection, &focus);
            m.generator.set_hotspots(hotspots);
        }
        if self.config.show_ambient_pulses {
            self.clear_pulses();
            self.seed_pulses(self.now);
        }
        debug!(regions = ?self.config.region_filter, "region filter changed");
    }

    pub fn toggle_ambient(&mut self) -> bool {
        self.config.show_ambient_pulses = !self.config.show_ambient_pulses;
        if self.state == PanelState::Ready {
            if self.config.show_ambient_pulses {
                self.seed_pulses(self.now);
            } else {
                self.clear_pulses();
            }
        }
        self.config.show_ambient_pulses
    }

    fn gestures_attached(&self) -> bool {
        self.state != PanelState::TornDown
    }

    fn rescaled(&mut self, changed: bool) -> bool {
        if changed {
            self.scene.rescale(self.viewport.scale());
        }
        changed
    }

    pub fn pan(&mut self, dx: f64, dy: f64) -> bool {
        let changed = self.gestures_attached() && self.viewport.pan(dx, dy);
        self.rescaled(changed)
    }

    pub fn begin_drag(&mut self, p: DVec2) {
        if self.gestures_attached() {
            self.viewport.begin_drag(p);
        }
    }

    pub fn drag_to(&mut self, p: DVec2) -> bool {
        let changed = self.gestures_attached() && self.viewport.drag_to(p);
        self.rescaled(changed)
    }

    pub fn end_drag(&mut self) {
        self.viewport.end_drag();
    }

    /// Zoom by `factor` keeping `p` (logical units) fixed
    pub fn zoom_at(&mut self, p: DVec2, factor: f64) -> bool {
        let changed = self.gestures_attached() && self.viewport.zoom_at(p, factor);
        self.rescaled(changed)
    }

    pub fn zoom_in_at(&mut self, p: DVec2) -> bool {
        let changed = self.gestures_attached() && self.viewport.zoom_in_at(p);
        self.rescaled(changed)
    }

    pub fn zoom_out_at(&mut self, p: DVec2) -> bool {
        let changed = self.gestures_attached() && self.viewport.zoom_out_at(p);
        self.rescaled(changed)
    }

    pub fn reset_view(&mut self) -> bool {
        let changed = self.gestures_attached() && self.viewport.reset();
        self.rescaled(changed)
    }

    /// Mapping from the logical viewport into a `cols` x `rows` cell area
    pub fn mapping(&self, cols: u16, rows: u16) -> ScreenMapping {
        ScreenMapping::new(
            cols as usize * 2,
            rows as usize * 4,
            self.config.width,
            self.config.height,
        )
    }

    pub fn render(&self, cols: u16, rows: u16) -> MapLayers {
        let mapping = self.mapping(cols, rows);
        self.map_renderer.render(
            self.atlas(),
            &self.scene,
            self.viewport.transform(),
            &mapping,
            cols as usize,
            rows as usize,
        )
    }

    /// Stop everything: timers, pending pulse starts, the scene, the loader
    /// and gesture handling. Later updates are no-ops.
    pub fn teardown(&mut self) {
        if self.state == PanelState::TornDown {
            return;
        }
        self.timers.clear_all();
        self.scene.clear();
        self.loader.cancel();
        self.viewport.end_drag();
        self.mounted = None;
        self.state = PanelState::TornDown;
        info!(
            ticks = self.stats.ticks,
            launched = self.stats.launched,
            dropped = self.stats.dropped,
            "map torn down"
        );
    }
}

impl Drop for MapPanel {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Travel follows the speed toggle; `speed_factor` scales every duration
fn event_timings(config: &MapConfig) -> EventTimings {
    let base = EventTimings::default();
    let f = config.speed_factor;
    EventTimings {
        travel: config.travel_ms(),
        line_fade: base.line_fade * f,
        arrival: base.arrival * f,
        destination_fade: base.destination_fade * f,
    }
}
