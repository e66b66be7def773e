//! Engine-independent day/night interpolator.
//!
//! Everything in this module is plain data driven by one scalar: the
//! celestial body's elevation angle in degrees. Each fixed tick the
//! [`DayNightController`] receives the freshly rotated elevation, advances
//! its previous/current pair, and runs three ramps in order:
//!
//! 1. star density (with hysteresis at the fully-on/fully-off ends),
//! 2. atmosphere haze thickness,
//! 3. day/night ambience crossfade.
//!
//! Outputs are pushed through narrow sink traits so the whole interpolator
//! can be exercised with test doubles, without a render or audio backend.

use bevy::prelude::*;

// =============================================================================
// Elevation windows
// =============================================================================

/// Inclusive elevation band in degrees.
///
/// A band alone is not a window: every use site additionally gates on the
/// heading sign (rising vs setting), which is what distinguishes dawn from
/// dusk at the same elevation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationBand {
    pub min_deg: f32,
    pub max_deg: f32,
}

impl ElevationBand {
    pub const fn new(min_deg: f32, max_deg: f32) -> Self {
        Self { min_deg, max_deg }
    }

    pub fn contains(&self, elevation_deg: f32) -> bool {
        elevation_deg >= self.min_deg && elevation_deg <= self.max_deg
    }

    pub fn is_inverted(&self) -> bool {
        self.min_deg > self.max_deg
    }
}

/// Which way the body is moving through the sky, judged from the elevation
/// pair. `None` when the pair is equal: with no heading there is no active
/// window, so a zero-delta tick freezes every ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Rising,
    Setting,
}

// =============================================================================
// Lamps
// =============================================================================

/// The four independently addressable lamps the cycle drives: the primary
/// body, the secondary body, and two ambient fill lights.
///
/// Doubles as an ECS tag: put it on any light entity and the plugin's lamp
/// adapter will steer that light's intensity.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lamp {
    Sun,
    Moon,
    FillA,
    FillB,
}

/// Internally tracked lamp intensities. The controller only ever writes the
/// lamp sink, so the authoritative levels live here, not in the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LampLevels {
    pub sun: f32,
    pub moon: f32,
    pub fill_a: f32,
    pub fill_b: f32,
}

impl LampLevels {
    pub fn get(&self, lamp: Lamp) -> f32 {
        match lamp {
            Lamp::Sun => self.sun,
            Lamp::Moon => self.moon,
            Lamp::FillA => self.fill_a,
            Lamp::FillB => self.fill_b,
        }
    }

    /// Apply one tick's worth of nudging. Both fills move by the same step.
    fn shift(&mut self, sun: f32, moon: f32, fill: f32) {
        self.sun += sun;
        self.moon += moon;
        self.fill_a += fill;
        self.fill_b += fill;
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Bounded particle count plus an on/off flag for the star field.
pub trait StarFieldSink {
    fn count(&self) -> u32;
    fn visible(&self) -> bool;
    fn set_count(&mut self, count: u32);
    fn set_visible(&mut self, visible: bool);
}

/// Get/set intensity for the four [`Lamp`]s.
pub trait LampSink {
    fn intensity(&self, lamp: Lamp) -> f32;
    fn set_intensity(&mut self, lamp: Lamp, intensity: f32);
}

/// Single named scalar render parameter for atmosphere haze.
pub trait AtmosphereSink {
    fn thickness(&self) -> f32;
    fn set_thickness(&mut self, thickness: f32);
}

/// Volume control for the two ambience groups. The day group fans out to
/// both day channels behind this interface.
pub trait AmbienceSink {
    fn day_volume(&self) -> f32;
    fn night_volume(&self) -> f32;
    fn set_day_volume(&mut self, volume: f32);
    fn set_night_volume(&mut self, volume: f32);
}

// =============================================================================
// Configuration
// =============================================================================

/// Tunable constants for the whole cycle. Everything here is a design
/// constant; nothing is renegotiated at runtime.
///
/// The three subsystems deliberately read three independently sized bands
/// (sound gets separate dusk and dawn bands, the dawn one wider), so they do
/// not activate or release in lockstep.
#[derive(Resource, Debug, Clone)]
pub struct CycleConfig {
    /// Angular speed of the sky rotation in degrees per second. Zero is a
    /// valid configuration and freezes the cycle.
    pub orbit_speed_deg_per_sec: f32,
    /// World-space pivot every [`SkyOrbit`](crate::SkyOrbit) satellite turns around.
    pub orbit_pivot: Vec3,
    /// Rotation axis. The default `X` keeps the orbit in the Y-Z plane so
    /// elevation sweeps the full -90..90 range.
    pub orbit_axis: Vec3,

    /// Band in which star density ramps (dusk while setting, dawn while rising).
    pub star_band: ElevationBand,
    /// Band in which haze thickness ramps. Same default span as the star
    /// band but kept as its own constant.
    pub haze_band: ElevationBand,
    /// Band in which the dusk crossfade runs.
    pub sound_dusk_band: ElevationBand,
    /// Band in which the dawn crossfade runs. Wider than the dusk band and
    /// wider than the star/haze band.
    pub sound_dawn_band: ElevationBand,

    /// Star count bounds, in whole stars.
    pub star_floor: f32,
    pub star_ceiling: f32,
    /// Saturation marks: at/above the high mark a dusk tick pins the count
    /// to the ceiling, at/below the low mark a dawn tick pins it to the
    /// floor and hides the field.
    pub star_low_mark: f32,
    pub star_high_mark: f32,
    /// Stars gained per degree of elevation change while dusk is active.
    pub star_gain_per_degree: f32,
    /// Stars lost per degree while dawn is active.
    pub star_loss_per_degree: f32,

    /// Per-tick lamp nudges while the star ramp is actively stepping. These
    /// are flat per-tick amounts, not scaled by the elevation delta.
    pub sun_dim_step: f32,
    pub moon_rise_step: f32,
    pub fill_dim_step: f32,
    /// Lamp levels at full day; also the initial state.
    pub day_lamp_levels: LampLevels,

    /// Flat per-tick haze increment (dusk) / decrement (dawn).
    pub haze_step: f32,
    /// Optional clamp for the haze scalar. Defaults to `None`; enable it to
    /// keep long lopsided cycles inside a sane render range.
    pub haze_limits: Option<(f32, f32)>,

    /// Flat per-tick fade-progress step for the crossfade.
    pub fade_step: f32,
    /// Volume ceilings per group, as a fraction of full scale.
    pub day_volume_ceiling: f32,
    pub night_volume_ceiling: f32,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            orbit_speed_deg_per_sec: 3.0,
            orbit_pivot: Vec3::ZERO,
            orbit_axis: Vec3::X,
            star_band: ElevationBand::new(-40.0, 55.0),
            haze_band: ElevationBand::new(-40.0, 55.0),
            sound_dusk_band: ElevationBand::new(-35.0, 50.0),
            sound_dawn_band: ElevationBand::new(-50.0, 65.0),
            star_floor: 1.0,
            star_ceiling: 5000.0,
            star_low_mark: 500.0,
            star_high_mark: 4500.0,
            star_gain_per_degree: 60.0,
            star_loss_per_degree: 60.0,
            sun_dim_step: 6.0,
            moon_rise_step: 0.25,
            fill_dim_step: 0.22,
            day_lamp_levels: LampLevels {
                sun: 10_000.0,
                moon: 0.0,
                fill_a: 400.0,
                fill_b: 400.0,
            },
            haze_step: 0.001,
            haze_limits: None,
            fade_step: 0.0008,
            day_volume_ceiling: 0.5,
            night_volume_ceiling: 0.5,
        }
    }
}

impl CycleConfig {
    /// Log suspect values. Configuration is never rejected at runtime; a
    /// frozen or inverted setup is the assembler's problem, but it should
    /// not be a silent one.
    pub fn audit(&self) {
        if self.orbit_speed_deg_per_sec == 0.0 {
            warn!("orbit speed is zero; the sky cycle is frozen");
        }
        if self.orbit_axis.try_normalize().is_none() {
            warn!("orbit axis is zero; the sky cannot rotate");
        }
        for (name, band) in [
            ("star_band", self.star_band),
            ("haze_band", self.haze_band),
            ("sound_dusk_band", self.sound_dusk_band),
            ("sound_dawn_band", self.sound_dawn_band),
        ] {
            if band.is_inverted() {
                warn!(
                    "{name} is inverted ({}..{}); it can never activate",
                    band.min_deg, band.max_deg
                );
            }
        }
        if self.star_floor > self.star_ceiling {
            warn!(
                "star floor {} exceeds ceiling {}",
                self.star_floor, self.star_ceiling
            );
        }
        if self.star_low_mark > self.star_high_mark {
            warn!(
                "star low mark {} exceeds high mark {}; both saturation checks can fire",
                self.star_low_mark, self.star_high_mark
            );
        }
        if self.day_volume_ceiling <= 0.0 || self.night_volume_ceiling <= 0.0 {
            warn!("a volume ceiling is non-positive; that ambience group is mute");
        }
        if let Some((lo, hi)) = self.haze_limits {
            if lo > hi {
                warn!("haze limits are inverted ({lo}..{hi})");
            }
        }
    }
}

// =============================================================================
// Cycle state
// =============================================================================

/// The mutable interpolation state, exclusively owned by the controller.
///
/// `previous_elevation` always holds the prior tick's `current_elevation`;
/// the pair is only ever moved together by [`CycleState::advance_elevation`],
/// so no tick can read a stale pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleState {
    pub previous_elevation: f32,
    pub current_elevation: f32,
    /// Star count accumulator. Fractional per-tick gains add up here; the
    /// sink sees it rounded to whole stars. Clamped to
    /// `[star_floor, star_ceiling]` on every write.
    pub star_count: f32,
    pub stars_visible: bool,
    /// Unbounded haze scalar, practically within a few units of zero unless
    /// `haze_limits` says otherwise.
    pub haze_thickness: f32,
    /// Fade progress per ambience group, each within `[0, ceiling]`.
    pub day_fade: f32,
    pub night_fade: f32,
    /// Published volumes, clamped to `[0, ceiling]` after every tick.
    pub day_volume: f32,
    pub night_volume: f32,
    pub lamps: LampLevels,
}

impl CycleState {
    /// Full-daylight plateau: stars at the floor and hidden, no haze, day
    /// ambience at its ceiling.
    pub fn initial(config: &CycleConfig) -> Self {
        Self {
            previous_elevation: 0.0,
            current_elevation: 0.0,
            star_count: config.star_floor,
            stars_visible: false,
            haze_thickness: config.haze_limits.map(|(lo, _)| lo).unwrap_or(0.0),
            day_fade: config.day_volume_ceiling,
            night_fade: 0.0,
            day_volume: config.day_volume_ceiling,
            night_volume: 0.0,
            lamps: config.day_lamp_levels,
        }
    }

    /// Move the elevation pair forward as one unit.
    pub fn advance_elevation(&mut self, elevation_deg: f32) {
        self.previous_elevation = self.current_elevation;
        self.current_elevation = elevation_deg;
    }

    /// Overwrite both halves of the pair, e.g. when the body is first
    /// spawned, so the first real tick does not see a bogus delta.
    pub fn reset_elevation(&mut self, elevation_deg: f32) {
        self.previous_elevation = elevation_deg;
        self.current_elevation = elevation_deg;
    }

    pub fn angle_delta(&self) -> f32 {
        (self.current_elevation - self.previous_elevation).abs()
    }

    pub fn heading(&self) -> Option<Heading> {
        if self.current_elevation < self.previous_elevation {
            Some(Heading::Setting)
        } else if self.current_elevation > self.previous_elevation {
            Some(Heading::Rising)
        } else {
            None
        }
    }

    fn rounded_star_count(&self) -> u32 {
        self.star_count.round() as u32
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Owns the [`CycleState`] and applies the three ramps to the injected
/// sinks, once per fixed tick, after the rotator has produced the new
/// elevation.
#[derive(Resource, Debug, Clone)]
pub struct DayNightController {
    pub config: CycleConfig,
    pub state: CycleState,
}

impl Default for DayNightController {
    fn default() -> Self {
        Self::new(CycleConfig::default())
    }
}

impl DayNightController {
    pub fn new(config: CycleConfig) -> Self {
        let state = CycleState::initial(&config);
        Self { config, state }
    }

    /// Run one tick: advance the elevation pair, then star density, haze,
    /// and the ambience crossfade, in that order.
    ///
    /// A tick where the elevation has not moved changes nothing: with a
    /// zero delta there is no heading, hence no active window.
    pub fn tick<S, L, A, M>(
        &mut self,
        elevation_deg: f32,
        stars: &mut S,
        lamps: &mut L,
        atmosphere: &mut A,
        ambience: &mut M,
    ) where
        S: StarFieldSink,
        L: LampSink,
        A: AtmosphereSink,
        M: AmbienceSink,
    {
        self.state.advance_elevation(elevation_deg);
        if self.state.angle_delta() == 0.0 {
            return;
        }
        self.ramp_star_density(stars, lamps);
        self.ramp_atmosphere(atmosphere);
        self.crossfade_ambience(ambience);
    }

    /// Push the current state into every sink. Used once at startup so the
    /// scene starts from the plateau the state describes; the ramps only
    /// write while a window is active.
    pub fn publish<S, L, A, M>(
        &self,
        stars: &mut S,
        lamps: &mut L,
        atmosphere: &mut A,
        ambience: &mut M,
    ) where
        S: StarFieldSink,
        L: LampSink,
        A: AtmosphereSink,
        M: AmbienceSink,
    {
        stars.set_count(self.state.rounded_star_count());
        stars.set_visible(self.state.stars_visible);
        push_lamps(lamps, &self.state.lamps);
        atmosphere.set_thickness(self.state.haze_thickness);
        ambience.set_day_volume(self.state.day_volume);
        ambience.set_night_volume(self.state.night_volume);
    }

    /// Star density with saturation hysteresis.
    ///
    /// The count gain scales with the elevation delta; the lamp nudges are
    /// flat per-tick amounts. The asymmetry is deliberate, so do not unify
    /// the two scalings.
    fn ramp_star_density<S, L>(&mut self, stars: &mut S, lamps: &mut L)
    where
        S: StarFieldSink,
        L: LampSink,
    {
        let config = &self.config;
        let state = &mut self.state;
        if !config.star_band.contains(state.current_elevation) {
            return;
        }
        let delta = state.angle_delta();
        match state.heading() {
            Some(Heading::Setting) => {
                if state.star_count >= config.star_high_mark {
                    // Idempotent saturation: pin to the ceiling, skip the
                    // increment and the lamp nudges for this tick.
                    state.star_count = config.star_ceiling;
                    stars.set_count(state.rounded_star_count());
                    return;
                }
                state.star_count =
                    (state.star_count + config.star_gain_per_degree * delta).min(config.star_ceiling);
                state.stars_visible = true;
                stars.set_count(state.rounded_star_count());
                stars.set_visible(true);
                state
                    .lamps
                    .shift(-config.sun_dim_step, config.moon_rise_step, -config.fill_dim_step);
                push_lamps(lamps, &state.lamps);
            }
            Some(Heading::Rising) => {
                if state.star_count <= config.star_low_mark {
                    state.star_count = config.star_floor;
                    state.stars_visible = false;
                    stars.set_count(state.rounded_star_count());
                    stars.set_visible(false);
                    return;
                }
                state.star_count =
                    (state.star_count - config.star_loss_per_degree * delta).max(config.star_floor);
                stars.set_count(state.rounded_star_count());
                state
                    .lamps
                    .shift(config.sun_dim_step, -config.moon_rise_step, config.fill_dim_step);
                push_lamps(lamps, &state.lamps);
            }
            None => {}
        }
    }

    /// Haze thickness: flat step per active tick, gated on the change being
    /// nonzero, never scaled by its magnitude.
    fn ramp_atmosphere<A: AtmosphereSink>(&mut self, atmosphere: &mut A) {
        let config = &self.config;
        let state = &mut self.state;
        if !config.haze_band.contains(state.current_elevation) {
            return;
        }
        match state.heading() {
            Some(Heading::Setting) => state.haze_thickness += config.haze_step,
            Some(Heading::Rising) => state.haze_thickness -= config.haze_step,
            None => return,
        }
        if let Some((lo, hi)) = config.haze_limits {
            state.haze_thickness = state.haze_thickness.clamp(lo, hi);
        }
        atmosphere.set_thickness(state.haze_thickness);
    }

    /// Day/night crossfade with terminal snaps.
    ///
    /// The dusk path assigns the fade progress to the volumes directly; the
    /// dawn path multiplies the assigned volumes by this tick's elevation
    /// delta. Deliberate asymmetry, same caveat as the lamp nudges.
    fn crossfade_ambience<M: AmbienceSink>(&mut self, ambience: &mut M) {
        let config = &self.config;
        let state = &mut self.state;
        let delta = state.angle_delta();
        match state.heading() {
            Some(Heading::Setting) if config.sound_dusk_band.contains(state.current_elevation) => {
                if state.day_fade <= 0.0 || state.night_fade >= config.night_volume_ceiling {
                    // Terminal snap: day channels silent, night at target.
                    state.day_fade = 0.0;
                    state.night_fade = config.night_volume_ceiling;
                    state.day_volume = 0.0;
                    state.night_volume = config.night_volume_ceiling;
                } else {
                    state.day_fade = (state.day_fade - config.fade_step).max(0.0);
                    state.night_fade =
                        (state.night_fade + config.fade_step).min(config.night_volume_ceiling);
                    state.day_volume = state.day_fade;
                    state.night_volume = state.night_fade;
                }
                ambience.set_day_volume(state.day_volume);
                ambience.set_night_volume(state.night_volume);
            }
            Some(Heading::Rising) if config.sound_dawn_band.contains(state.current_elevation) => {
                if state.day_fade >= config.day_volume_ceiling || state.night_fade <= 0.0 {
                    state.day_fade = config.day_volume_ceiling;
                    state.night_fade = 0.0;
                    state.day_volume = config.day_volume_ceiling;
                    state.night_volume = 0.0;
                } else {
                    state.day_fade = (state.day_fade + config.fade_step).min(config.day_volume_ceiling);
                    state.night_fade = (state.night_fade - config.fade_step).max(0.0);
                    state.day_volume =
                        (state.day_fade * delta).clamp(0.0, config.day_volume_ceiling);
                    state.night_volume =
                        (state.night_fade * delta).clamp(0.0, config.night_volume_ceiling);
                }
                ambience.set_day_volume(state.day_volume);
                ambience.set_night_volume(state.night_volume);
            }
            _ => {}
        }
    }
}

fn push_lamps<L: LampSink>(sink: &mut L, levels: &LampLevels) {
    sink.set_intensity(Lamp::Sun, levels.sun);
    sink.set_intensity(Lamp::Moon, levels.moon);
    sink.set_intensity(Lamp::FillA, levels.fill_a);
    sink.set_intensity(Lamp::FillB, levels.fill_b);
}

// =============================================================================
// Unit tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockStars {
        count: u32,
        visible: bool,
        writes: u32,
    }

    impl StarFieldSink for MockStars {
        fn count(&self) -> u32 {
            self.count
        }
        fn visible(&self) -> bool {
            self.visible
        }
        fn set_count(&mut self, count: u32) {
            self.count = count;
            self.writes += 1;
        }
        fn set_visible(&mut self, visible: bool) {
            self.visible = visible;
        }
    }

    #[derive(Default)]
    struct MockLamps {
        sun: f32,
        moon: f32,
        fill_a: f32,
        fill_b: f32,
    }

    impl LampSink for MockLamps {
        fn intensity(&self, lamp: Lamp) -> f32 {
            match lamp {
                Lamp::Sun => self.sun,
                Lamp::Moon => self.moon,
                Lamp::FillA => self.fill_a,
                Lamp::FillB => self.fill_b,
            }
        }
        fn set_intensity(&mut self, lamp: Lamp, intensity: f32) {
            match lamp {
                Lamp::Sun => self.sun = intensity,
                Lamp::Moon => self.moon = intensity,
                Lamp::FillA => self.fill_a = intensity,
                Lamp::FillB => self.fill_b = intensity,
            }
        }
    }

    #[derive(Default)]
    struct MockAtmosphere {
        thickness: f32,
        writes: u32,
    }

    impl AtmosphereSink for MockAtmosphere {
        fn thickness(&self) -> f32 {
            self.thickness
        }
        fn set_thickness(&mut self, thickness: f32) {
            self.thickness = thickness;
            self.writes += 1;
        }
    }

    #[derive(Default)]
    struct MockAmbience {
        day: f32,
        night: f32,
    }

    impl AmbienceSink for MockAmbience {
        fn day_volume(&self) -> f32 {
            self.day
        }
        fn night_volume(&self) -> f32 {
            self.night
        }
        fn set_day_volume(&mut self, volume: f32) {
            self.day = volume;
        }
        fn set_night_volume(&mut self, volume: f32) {
            self.night = volume;
        }
    }

    /// Controller plus one mock of each sink, ticked together.
    struct Rig {
        controller: DayNightController,
        stars: MockStars,
        lamps: MockLamps,
        atmosphere: MockAtmosphere,
        ambience: MockAmbience,
    }

    impl Rig {
        fn new(config: CycleConfig) -> Self {
            Self {
                controller: DayNightController::new(config),
                stars: MockStars::default(),
                lamps: MockLamps::default(),
                atmosphere: MockAtmosphere::default(),
                ambience: MockAmbience::default(),
            }
        }

        fn tick(&mut self, elevation_deg: f32) {
            self.controller.tick(
                elevation_deg,
                &mut self.stars,
                &mut self.lamps,
                &mut self.atmosphere,
                &mut self.ambience,
            );
        }

        fn state(&self) -> &CycleState {
            &self.controller.state
        }
    }

    fn test_config() -> CycleConfig {
        CycleConfig {
            star_gain_per_degree: 25.0,
            star_loss_per_degree: 25.0,
            ..CycleConfig::default()
        }
    }

    #[test]
    fn test_zero_delta_tick_changes_nothing() {
        let mut rig = Rig::new(test_config());
        rig.controller.state.reset_elevation(54.0);
        rig.controller.state.star_count = 100.0;
        rig.tick(50.0); // one real dusk tick to get mid-ramp values
        let state_before = rig.state().clone();
        let stars_before = (rig.stars.count, rig.stars.visible);
        let atmo_before = rig.atmosphere.thickness;
        let ambience_before = (rig.ambience.day, rig.ambience.night);

        rig.tick(50.0); // elevation has not moved

        assert_eq!(rig.state().previous_elevation, 50.0);
        assert_eq!(rig.state().current_elevation, 50.0);
        assert_eq!(rig.state().star_count, state_before.star_count);
        assert_eq!(rig.state().haze_thickness, state_before.haze_thickness);
        assert_eq!(rig.state().day_volume, state_before.day_volume);
        assert_eq!(rig.state().night_volume, state_before.night_volume);
        assert_eq!((rig.stars.count, rig.stars.visible), stars_before);
        assert_eq!(rig.atmosphere.thickness, atmo_before);
        assert_eq!((rig.ambience.day, rig.ambience.night), ambience_before);
    }

    #[test]
    fn test_dusk_tick_gains_stars_scaled_by_delta() {
        let mut rig = Rig::new(test_config());
        rig.controller.state.reset_elevation(54.0);
        rig.controller.state.star_count = 100.0;

        rig.tick(50.0); // delta 4, setting, inside the star band

        assert_eq!(rig.state().star_count, 200.0);
        assert_eq!(rig.stars.count, 200);
        assert!(rig.stars.visible);
        assert!(rig.state().stars_visible);
    }

    #[test]
    fn test_near_ceiling_dusk_tick_pins_to_ceiling() {
        let mut rig = Rig::new(test_config());
        rig.controller.state.reset_elevation(54.0);
        rig.controller.state.star_count = 4500.0;
        let lamps_before = rig.state().lamps;

        rig.tick(50.0);

        assert_eq!(rig.state().star_count, 5000.0);
        assert_eq!(rig.stars.count, 5000);
        // The saturation short-circuit skips the increment and the nudges.
        assert_eq!(rig.state().lamps, lamps_before);
    }

    #[test]
    fn test_ceiling_is_sticky_across_dusk_ticks() {
        let mut rig = Rig::new(test_config());
        rig.controller.state.reset_elevation(54.0);
        rig.controller.state.star_count = 4800.0;

        for elevation in [50.0, 46.0, 42.0, 38.0] {
            rig.tick(elevation);
            assert_eq!(rig.state().star_count, 5000.0);
            assert_eq!(rig.stars.count, 5000);
        }
    }

    #[test]
    fn test_near_floor_dawn_tick_pins_and_hides() {
        let mut rig = Rig::new(test_config());
        rig.controller.state.reset_elevation(40.0);
        rig.controller.state.star_count = 500.0;
        rig.controller.state.stars_visible = true;

        rig.tick(44.0); // rising, inside the star band

        assert_eq!(rig.state().star_count, 1.0);
        assert_eq!(rig.stars.count, 1);
        assert!(!rig.stars.visible);
        assert!(!rig.state().stars_visible);

        // Further dawn ticks keep the field pinned and hidden.
        rig.tick(48.0);
        assert_eq!(rig.state().star_count, 1.0);
        assert!(!rig.state().stars_visible);
    }

    #[test]
    fn test_visibility_returns_when_dusk_reenters() {
        let mut rig = Rig::new(test_config());
        rig.controller.state.reset_elevation(40.0);
        rig.controller.state.star_count = 400.0;
        rig.controller.state.stars_visible = true;

        rig.tick(44.0); // dawn floor snap
        assert!(!rig.state().stars_visible);

        rig.tick(41.0); // setting again: dusk window re-entered
        assert!(rig.state().stars_visible);
        assert!(rig.stars.visible);
        assert!(rig.state().star_count > 1.0);
    }

    #[test]
    fn test_star_count_never_leaves_bounds() {
        let mut rig = Rig::new(test_config());
        rig.controller.state.reset_elevation(55.0);
        // Sweep down through the band, bounce, and come back up; huge deltas
        // so the increments would overshoot without the clamps.
        let walk = [
            30.0, 5.0, -20.0, -39.0, -10.0, 20.0, 50.0, 54.0, 30.0, -5.0, -35.0, 0.0, 40.0,
        ];
        for elevation in walk {
            rig.tick(elevation);
            let count = rig.state().star_count;
            assert!(
                (1.0..=5000.0).contains(&count),
                "star count {count} escaped bounds at elevation {elevation}"
            );
        }
    }

    #[test]
    fn test_lamp_nudges_are_flat_while_star_gain_scales() {
        let mut rig = Rig::new(test_config());
        rig.controller.state.reset_elevation(54.0);
        rig.controller.state.star_count = 100.0;
        let day = rig.controller.config.day_lamp_levels;
        let sun_step = rig.controller.config.sun_dim_step;
        let moon_step = rig.controller.config.moon_rise_step;
        let fill_step = rig.controller.config.fill_dim_step;

        rig.tick(50.0); // delta 4
        rig.tick(49.5); // delta 0.5

        // Two active ticks: lamp movement is two flat steps regardless of
        // the very different deltas...
        assert_eq!(rig.state().lamps.sun, day.sun - 2.0 * sun_step);
        assert_eq!(rig.state().lamps.moon, day.moon + 2.0 * moon_step);
        assert!((rig.state().lamps.fill_a - (day.fill_a - 2.0 * fill_step)).abs() < 1e-3);
        assert!((rig.state().lamps.fill_b - (day.fill_b - 2.0 * fill_step)).abs() < 1e-3);
        assert_eq!(rig.lamps.sun, rig.state().lamps.sun);
        // ...while the star gain covered 4.5 degrees' worth.
        assert_eq!(rig.state().star_count, 100.0 + 25.0 * 4.5);
    }

    #[test]
    fn test_dawn_nudges_mirror_dusk() {
        let mut rig = Rig::new(test_config());
        rig.controller.state.reset_elevation(40.0);
        rig.controller.state.star_count = 2000.0;
        let day = rig.controller.config.day_lamp_levels;
        let sun_step = rig.controller.config.sun_dim_step;

        rig.tick(44.0);

        assert_eq!(rig.state().lamps.sun, day.sun + sun_step);
        assert_eq!(rig.state().star_count, 2000.0 - 25.0 * 4.0);
    }

    #[test]
    fn test_haze_rises_at_dusk_falls_at_dawn() {
        let mut rig = Rig::new(test_config());
        rig.controller.state.reset_elevation(54.0);

        let mut last = rig.state().haze_thickness;
        for elevation in [50.0, 46.0, 40.0, 39.5] {
            rig.tick(elevation);
            assert!(
                rig.state().haze_thickness > last,
                "haze must strictly increase across dusk ticks"
            );
            last = rig.state().haze_thickness;
        }

        for elevation in [41.0, 45.0, 50.0] {
            rig.tick(elevation);
            assert!(
                rig.state().haze_thickness < last,
                "haze must strictly decrease across dawn ticks"
            );
            last = rig.state().haze_thickness;
        }
    }

    #[test]
    fn test_haze_step_ignores_delta_magnitude() {
        let step = test_config().haze_step;
        let mut rig = Rig::new(test_config());
        rig.controller.state.reset_elevation(54.0);

        rig.tick(50.0); // delta 4
        let after_big = rig.state().haze_thickness;
        rig.tick(49.9); // delta 0.1
        let after_small = rig.state().haze_thickness;

        assert!((after_big - step).abs() < 1e-6);
        assert!((after_small - 2.0 * step).abs() < 1e-6);
    }

    #[test]
    fn test_haze_frozen_outside_band() {
        let mut rig = Rig::new(test_config());
        rig.controller.state.reset_elevation(80.0);

        rig.tick(75.0); // setting, but above the haze and star bands

        assert_eq!(rig.state().haze_thickness, 0.0);
        assert_eq!(rig.atmosphere.writes, 0);
        assert_eq!(rig.stars.writes, 0);
    }

    #[test]
    fn test_haze_optional_clamp() {
        let config = CycleConfig {
            haze_limits: Some((0.0, 0.0025)),
            ..test_config()
        };
        let mut rig = Rig::new(config);
        rig.controller.state.reset_elevation(54.0);

        for elevation in [50.0, 46.0, 42.0, 38.0, 34.0] {
            rig.tick(elevation);
        }

        assert_eq!(rig.state().haze_thickness, 0.0025);
        assert_eq!(rig.atmosphere.thickness, 0.0025);
    }

    #[test]
    fn test_dusk_crossfade_assigns_progress_directly() {
        let config = CycleConfig {
            fade_step: 0.05,
            ..test_config()
        };
        let mut rig = Rig::new(config);
        rig.controller.state.reset_elevation(48.0);

        rig.tick(44.0); // inside the sound dusk band, setting

        assert_eq!(rig.state().day_fade, 0.45);
        assert_eq!(rig.state().night_fade, 0.05);
        assert_eq!(rig.ambience.day, 0.45);
        assert_eq!(rig.ambience.night, 0.05);
    }

    #[test]
    fn test_dusk_saturation_snap_is_idempotent() {
        let mut rig = Rig::new(test_config());
        rig.controller.state.reset_elevation(48.0);
        rig.controller.state.day_fade = 0.0;
        rig.controller.state.night_fade = 0.5;
        rig.controller.state.day_volume = 0.0;
        rig.controller.state.night_volume = 0.5;

        rig.tick(44.0); // one more dusk tick at the terminal state

        assert_eq!(rig.state().day_volume, 0.0);
        assert_eq!(rig.state().night_volume, 0.5);
        assert_eq!(rig.ambience.day, 0.0);
        assert_eq!(rig.ambience.night, 0.5);
    }

    #[test]
    fn test_volumes_complementary_after_saturation() {
        let config = CycleConfig {
            fade_step: 0.2,
            ..test_config()
        };
        let mut rig = Rig::new(config);
        rig.controller.state.reset_elevation(49.0);

        // Three dusk ticks are enough to drive the fades to their rails.
        for elevation in [47.0, 45.0, 43.0, 41.0] {
            rig.tick(elevation);
        }
        assert_eq!(rig.state().day_volume + rig.state().night_volume, 0.5);
        assert_eq!(rig.state().day_volume, 0.0);

        // Now ride back up through the dawn band until it snaps.
        for elevation in [43.0, 45.0, 47.0, 49.0, 51.0] {
            rig.tick(elevation);
        }
        assert_eq!(rig.state().day_volume + rig.state().night_volume, 0.5);
        assert_eq!(rig.state().night_volume, 0.0);
    }

    #[test]
    fn test_dawn_volumes_scale_by_delta() {
        let config = CycleConfig {
            fade_step: 0.05,
            ..test_config()
        };
        let mut rig = Rig::new(config);
        rig.controller.state.reset_elevation(40.0);
        rig.controller.state.day_fade = 0.2;
        rig.controller.state.night_fade = 0.3;

        rig.tick(42.0); // rising, delta 2, inside the sound dawn band

        // Progress stepped by the flat amount, but the published volumes are
        // multiplied by the tick's delta (and clamped to the ceiling).
        assert_eq!(rig.state().day_fade, 0.25);
        assert_eq!(rig.state().night_fade, 0.25);
        assert_eq!(rig.state().day_volume, 0.5); // 0.25 * 2.0 again clamped
        assert_eq!(rig.state().night_volume, 0.5);

        let mut rig = Rig::new(CycleConfig {
            fade_step: 0.05,
            ..test_config()
        });
        rig.controller.state.reset_elevation(40.0);
        rig.controller.state.day_fade = 0.2;
        rig.controller.state.night_fade = 0.3;

        rig.tick(40.1); // delta 0.1
        assert!((rig.state().day_volume - 0.025).abs() < 1e-6);
        assert!((rig.state().night_volume - 0.025).abs() < 1e-6);
    }

    #[test]
    fn test_sound_dawn_band_wider_than_dusk_band() {
        let config = test_config();
        assert!(config.sound_dawn_band.min_deg < config.sound_dusk_band.min_deg);
        assert!(config.sound_dawn_band.max_deg > config.sound_dusk_band.max_deg);
        assert!(config.sound_dawn_band.max_deg > config.star_band.max_deg);

        // Rising at 60: the dawn crossfade runs while the star and haze
        // ramps are already frozen above their band.
        let mut rig = Rig::new(CycleConfig {
            fade_step: 0.05,
            ..test_config()
        });
        rig.controller.state.reset_elevation(58.0);
        rig.controller.state.day_fade = 0.1;
        rig.controller.state.night_fade = 0.4;
        rig.controller.state.star_count = 3000.0;
        let haze_before = rig.state().haze_thickness;

        rig.tick(60.0);

        assert_eq!(rig.state().star_count, 3000.0);
        assert_eq!(rig.state().haze_thickness, haze_before);
        assert_eq!(rig.state().day_fade, 0.15);
    }

    #[test]
    fn test_elevation_pair_never_stale() {
        let mut rig = Rig::new(test_config());
        rig.tick(10.0);
        assert_eq!(rig.state().previous_elevation, 0.0);
        assert_eq!(rig.state().current_elevation, 10.0);
        rig.tick(20.0);
        assert_eq!(rig.state().previous_elevation, 10.0);
        assert_eq!(rig.state().current_elevation, 20.0);
    }

    #[test]
    fn test_initial_state_is_full_day() {
        let config = test_config();
        let state = CycleState::initial(&config);
        assert_eq!(state.star_count, config.star_floor);
        assert!(!state.stars_visible);
        assert_eq!(state.day_volume, config.day_volume_ceiling);
        assert_eq!(state.night_volume, 0.0);
        assert_eq!(state.lamps, config.day_lamp_levels);
    }

    #[test]
    fn test_publish_pushes_whole_state() {
        let mut rig = Rig::new(test_config());
        rig.controller.state.star_count = 1234.0;
        rig.controller.state.stars_visible = true;
        rig.controller.state.haze_thickness = 0.8;
        rig.controller.state.day_volume = 0.25;
        rig.controller.state.night_volume = 0.25;

        rig.controller.publish(
            &mut rig.stars,
            &mut rig.lamps,
            &mut rig.atmosphere,
            &mut rig.ambience,
        );

        assert_eq!(rig.stars.count, 1234);
        assert!(rig.stars.visible);
        assert_eq!(rig.atmosphere.thickness, 0.8);
        assert_eq!(rig.ambience.day, 0.25);
        assert_eq!(rig.ambience.night, 0.25);
        assert_eq!(rig.lamps.sun, rig.state().lamps.sun);
    }

    #[test]
    fn test_full_revolution_with_defaults() {
        // Drive a whole cycle headlessly: descend from the zenith to the
        // nadir, then climb back. Defaults must saturate both ends.
        let mut rig = Rig::new(CycleConfig::default());
        rig.controller.state.reset_elevation(90.0);

        let steps = 1800;
        for i in 1..=steps {
            let elevation = 90.0 - 180.0 * i as f32 / steps as f32;
            rig.tick(elevation);
            let count = rig.state().star_count;
            assert!((1.0..=5000.0).contains(&count));
        }
        // Night plateau: stars pinned high and visible, night ambience on.
        assert_eq!(rig.state().star_count, 5000.0);
        assert!(rig.state().stars_visible);
        assert_eq!(rig.state().night_volume, 0.5);
        assert_eq!(rig.state().day_volume, 0.0);

        for i in 1..=steps {
            let elevation = -90.0 + 180.0 * i as f32 / steps as f32;
            rig.tick(elevation);
        }
        // Back to the day plateau.
        assert_eq!(rig.state().star_count, 1.0);
        assert!(!rig.state().stars_visible);
        assert_eq!(rig.state().day_volume, 0.5);
        assert_eq!(rig.state().night_volume, 0.0);
    }

    #[test]
    fn test_band_containment_is_inclusive() {
        let band = ElevationBand::new(-40.0, 55.0);
        assert!(band.contains(-40.0));
        assert!(band.contains(55.0));
        assert!(!band.contains(55.1));
        assert!(!band.contains(-40.1));
        assert!(!band.is_inverted());
        assert!(ElevationBand::new(10.0, -10.0).is_inverted());
    }
}
