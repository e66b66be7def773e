pub mod cycle;
pub mod star_field;

use bevy::audio::{AudioSink, AudioSinkPlayback, Volume};
use bevy::pbr::{DistanceFog, FogFalloff};
use bevy::prelude::*;
use std::f32::consts::PI;

use crate::cycle::{
    AmbienceSink, AtmosphereSink, CycleState, DayNightController, Lamp, LampLevels, LampSink,
    StarFieldSink,
};
use crate::star_field::StarField;

// Helper constants
pub const DEGREES_TO_RADIANS: f32 = PI / 180.0;
pub const RADIANS_TO_DEGREES: f32 = 180.0 / PI;

pub struct SkyCyclePlugin;

impl Plugin for SkyCyclePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DayNightController>();
        app.configure_sets(
            FixedUpdate,
            (SkyCycleSet::Rotate, SkyCycleSet::Interpolate).chain(),
        );
        app.add_systems(FixedUpdate, rotate_sky.in_set(SkyCycleSet::Rotate));
        app.add_systems(FixedUpdate, drive_cycle.in_set(SkyCycleSet::Interpolate));
        app.add_systems(PostStartup, (audit_cycle_config, seed_cycle));
        app.add_systems(
            Update,
            (apply_haze_fog, sync_ambience_audio).in_set(SkyCycleSet::Apply),
        );
    }
}

/// Rotation must land before interpolation within one fixed tick; the
/// follow-ups in `Apply` run on the render cadence instead.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkyCycleSet {
    Rotate,
    Interpolate,
    Apply,
}

/// Anything carrying this marker is swept around the orbit pivot every
/// fixed tick: the celestial body itself, but also decorations that should
/// ride along with the sky.
#[derive(Component, Default, Debug, Clone)]
#[require(Transform)]
pub struct SkyOrbit;

/// The rotating body whose elevation drives the whole cycle. Exactly one
/// is expected; with none or several the interpolator stands still.
#[derive(Component, Default, Debug, Clone)]
#[require(SkyOrbit, Transform)]
pub struct CelestialBody {
    /// Elevation above the pivot's horizontal plane in degrees, refreshed
    /// from the transform each fixed tick.
    pub elevation_deg: f32,
}

/// Haze scalar mirrored from the controller, usually on the camera entity.
/// [`apply_haze_fog`] maps it onto `DistanceFog` when both are present.
#[derive(Component, Default, Debug, Clone)]
pub struct SkyHaze {
    pub thickness: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbienceGroup {
    Day,
    Night,
}

/// A looping ambience emitter. `volume` is what the cycle asked for;
/// [`sync_ambience_audio`] pushes it into the entity's `AudioSink` once
/// playback exists. Several channels may share a group.
#[derive(Component, Debug, Clone)]
pub struct AmbienceChannel {
    pub group: AmbienceGroup,
    pub volume: f32,
}

impl AmbienceChannel {
    pub fn new(group: AmbienceGroup) -> Self {
        Self { group, volume: 0.0 }
    }
}

/// Elevation of a point above the pivot's horizontal plane, in degrees.
pub fn elevation_of(translation: Vec3, pivot: Vec3) -> f32 {
    match (translation - pivot).try_normalize() {
        Some(direction) => direction.y.clamp(-1.0, 1.0).asin() * RADIANS_TO_DEGREES,
        None => 0.0,
    }
}

fn audit_cycle_config(controller: Res<DayNightController>) {
    controller.config.audit();
}

/// Sweep every [`SkyOrbit`] around the pivot and refresh the body's
/// elevation. A zero speed leaves the transforms alone, which in turn
/// freezes the interpolator on a zero delta.
fn rotate_sky(
    controller: Res<DayNightController>,
    time: Res<Time>,
    mut q_orbit: Query<(&mut Transform, Option<&mut CelestialBody>), With<SkyOrbit>>,
) {
    let config = &controller.config;
    let Some(axis) = config.orbit_axis.try_normalize() else {
        return;
    };
    let step_deg = config.orbit_speed_deg_per_sec * time.delta_secs();
    if step_deg == 0.0 {
        return;
    }

    let rotation = Quat::from_axis_angle(axis, step_deg * DEGREES_TO_RADIANS);
    for (mut transform, body) in q_orbit.iter_mut() {
        transform.rotate_around(config.orbit_pivot, rotation);
        if let Some(mut body) = body {
            body.elevation_deg = elevation_of(transform.translation, config.orbit_pivot);
        }
    }
}

// Staged sink writes for one tick. The controller only writes a sink while
// its window is active, so each slot records whether a write happened at
// all; untouched slots leave the ECS alone afterwards.

#[derive(Default)]
struct StagedStars {
    count: Option<u32>,
    visible: Option<bool>,
    current_count: u32,
    current_visible: bool,
}

impl StarFieldSink for StagedStars {
    fn count(&self) -> u32 {
        self.count.unwrap_or(self.current_count)
    }
    fn visible(&self) -> bool {
        self.visible.unwrap_or(self.current_visible)
    }
    fn set_count(&mut self, count: u32) {
        self.count = Some(count);
    }
    fn set_visible(&mut self, visible: bool) {
        self.visible = Some(visible);
    }
}

struct StagedLamps {
    levels: [Option<f32>; 4],
    current: LampLevels,
}

fn lamp_index(lamp: Lamp) -> usize {
    match lamp {
        Lamp::Sun => 0,
        Lamp::Moon => 1,
        Lamp::FillA => 2,
        Lamp::FillB => 3,
    }
}

impl LampSink for StagedLamps {
    fn intensity(&self, lamp: Lamp) -> f32 {
        self.levels[lamp_index(lamp)].unwrap_or(self.current.get(lamp))
    }
    fn set_intensity(&mut self, lamp: Lamp, intensity: f32) {
        self.levels[lamp_index(lamp)] = Some(intensity);
    }
}

#[derive(Default)]
struct StagedHaze {
    thickness: Option<f32>,
    current: f32,
}

impl AtmosphereSink for StagedHaze {
    fn thickness(&self) -> f32 {
        self.thickness.unwrap_or(self.current)
    }
    fn set_thickness(&mut self, thickness: f32) {
        self.thickness = Some(thickness);
    }
}

#[derive(Default)]
struct StagedAmbience {
    day: Option<f32>,
    night: Option<f32>,
    current_day: f32,
    current_night: f32,
}

impl AmbienceSink for StagedAmbience {
    fn day_volume(&self) -> f32 {
        self.day.unwrap_or(self.current_day)
    }
    fn night_volume(&self) -> f32 {
        self.night.unwrap_or(self.current_night)
    }
    fn set_day_volume(&mut self, volume: f32) {
        self.day = Some(volume);
    }
    fn set_night_volume(&mut self, volume: f32) {
        self.night = Some(volume);
    }
}

fn staged_from_state(state: &CycleState) -> (StagedStars, StagedLamps, StagedHaze, StagedAmbience) {
    (
        StagedStars {
            current_count: state.star_count.round() as u32,
            current_visible: state.stars_visible,
            ..Default::default()
        },
        StagedLamps {
            levels: [None; 4],
            current: state.lamps,
        },
        StagedHaze {
            current: state.haze_thickness,
            ..Default::default()
        },
        StagedAmbience {
            current_day: state.day_volume,
            current_night: state.night_volume,
            ..Default::default()
        },
    )
}

/// Feed the freshly derived elevation to the controller, then copy staged
/// sink writes onto whatever star field, lamps, haze holders and ambience
/// channels the scene actually has.
fn drive_cycle(
    mut controller: ResMut<DayNightController>,
    q_body: Query<&CelestialBody>,
    mut q_star_field: Query<&mut StarField>,
    mut q_lamps: Query<(
        &Lamp,
        AnyOf<(&mut DirectionalLight, &mut PointLight, &mut SpotLight)>,
    )>,
    mut q_haze: Query<&mut SkyHaze>,
    mut q_channels: Query<&mut AmbienceChannel>,
) {
    let Ok(body) = q_body.single() else {
        return;
    };

    let (mut stars, mut lamps, mut haze, mut ambience) = staged_from_state(&controller.state);
    controller.tick(
        body.elevation_deg,
        &mut stars,
        &mut lamps,
        &mut haze,
        &mut ambience,
    );

    if stars.count.is_some() || stars.visible.is_some() {
        if let Ok(mut field) = q_star_field.single_mut() {
            if let Some(count) = stars.count {
                field.count = count;
            }
            if let Some(visible) = stars.visible {
                field.visible = visible;
            }
        }
    }

    for (lamp, (directional, point, spot)) in q_lamps.iter_mut() {
        let Some(level) = lamps.levels[lamp_index(*lamp)] else {
            continue;
        };
        // Lamp levels are unclamped in the interpolator; lights saturate at
        // zero here instead.
        let level = level.max(0.0);
        if let Some(mut light) = directional {
            light.illuminance = level;
        }
        if let Some(mut light) = point {
            light.intensity = level;
        }
        if let Some(mut light) = spot {
            light.intensity = level;
        }
    }

    if let Some(thickness) = haze.thickness {
        for mut sky_haze in q_haze.iter_mut() {
            sky_haze.thickness = thickness;
        }
    }

    if ambience.day.is_some() || ambience.night.is_some() {
        for mut channel in q_channels.iter_mut() {
            match channel.group {
                AmbienceGroup::Day => {
                    if let Some(day) = ambience.day {
                        channel.volume = day;
                    }
                }
                AmbienceGroup::Night => {
                    if let Some(night) = ambience.night {
                        channel.volume = night;
                    }
                }
            }
        }
    }
}

/// One-time push of the initial plateau into the scene, and an elevation
/// seed so the first real tick does not see a bogus delta against zero.
fn seed_cycle(
    mut controller: ResMut<DayNightController>,
    mut q_body: Query<(&Transform, &mut CelestialBody)>,
    mut q_star_field: Query<&mut StarField>,
    mut q_lamps: Query<(
        &Lamp,
        AnyOf<(&mut DirectionalLight, &mut PointLight, &mut SpotLight)>,
    )>,
    mut q_haze: Query<&mut SkyHaze>,
    mut q_channels: Query<&mut AmbienceChannel>,
) {
    let pivot = controller.config.orbit_pivot;
    if let Ok((transform, mut body)) = q_body.single_mut() {
        body.elevation_deg = elevation_of(transform.translation, pivot);
        controller.state.reset_elevation(body.elevation_deg);
    }

    let state = controller.state.clone();
    if let Ok(mut field) = q_star_field.single_mut() {
        field.count = state.star_count.round() as u32;
        field.visible = state.stars_visible;
    }
    for (lamp, (directional, point, spot)) in q_lamps.iter_mut() {
        let level = state.lamps.get(*lamp).max(0.0);
        if let Some(mut light) = directional {
            light.illuminance = level;
        }
        if let Some(mut light) = point {
            light.intensity = level;
        }
        if let Some(mut light) = spot {
            light.intensity = level;
        }
    }
    for mut sky_haze in q_haze.iter_mut() {
        sky_haze.thickness = state.haze_thickness;
    }
    for mut channel in q_channels.iter_mut() {
        channel.volume = match channel.group {
            AmbienceGroup::Day => state.day_volume,
            AmbienceGroup::Night => state.night_volume,
        };
    }
}

/// Map the haze scalar onto the camera's distance fog.
fn apply_haze_fog(mut q_haze: Query<(&SkyHaze, &mut DistanceFog), Changed<SkyHaze>>) {
    for (haze, mut fog) in q_haze.iter_mut() {
        fog.falloff = FogFalloff::Exponential {
            density: haze.thickness.max(0.0),
        };
    }
}

/// Push requested channel volumes into the audio sinks. The sink component
/// only appears once playback has started, so this keeps retrying instead
/// of reacting to channel changes.
fn sync_ambience_audio(mut q_channels: Query<(&AmbienceChannel, &mut AudioSink)>) {
    for (channel, mut sink) in q_channels.iter_mut() {
        let wanted = channel.volume.max(0.0);
        if (sink.volume().to_linear() - wanted).abs() > f32::EPSILON {
            sink.set_volume(Volume::Linear(wanted));
        }
    }
}
