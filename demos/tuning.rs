use bevy::{
    core_pipeline::{bloom::Bloom, tonemapping::Tonemapping},
    pbr::{Atmosphere, AtmosphereSettings, DistanceFog, light_consts::lux},
    prelude::*,
    render::{camera::Exposure, mesh::Mesh3d},
};
use bevy_egui::{EguiContexts, EguiPlugin, egui};
use bevy_sky_cycle::{cycle::*, star_field::*, *};
use egui_plot::{Line, Plot};

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(SkyCyclePlugin)
        .add_plugins(StarFieldPlugin)
        .add_plugins(EguiPlugin {
            enable_multipass_for_primary_context: false,
        })
        .insert_resource(DayNightController::new(CycleConfig {
            orbit_speed_deg_per_sec: 6.0,
            ..Default::default()
        }))
        .add_systems(Startup, (setup_camera_fog, setup_scene))
        .add_systems(Update, ui_system)
        .run();
}

fn setup_camera_fog(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(-1.2, 0.15, 0.0).looking_at(Vec3::Y * 0.1, Vec3::Y),
        Camera {
            hdr: true,
            ..default()
        },
        Atmosphere::EARTH,
        AtmosphereSettings {
            aerial_view_lut_max_distance: 3.2e5,
            scene_units_to_m: 1e+4,
            ..Default::default()
        },
        Exposure::SUNLIGHT,
        Tonemapping::AcesFitted,
        Bloom::NATURAL,
        DistanceFog::default(),
        SkyHaze::default(),
    ));
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let morning = 30.0_f32 * DEGREES_TO_RADIANS;
    commands.spawn((
        CelestialBody::default(),
        Lamp::Sun,
        DirectionalLight {
            shadows_enabled: true,
            illuminance: lux::AMBIENT_DAYLIGHT,
            ..default()
        },
        Transform::from_xyz(0.0, 100.0 * morning.sin(), -100.0 * morning.cos())
            .looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        SkyOrbit,
        Lamp::Moon,
        DirectionalLight {
            illuminance: 0.0,
            ..default()
        },
        Transform::from_xyz(0.0, -100.0 * morning.sin(), 100.0 * morning.cos())
            .looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        Lamp::FillA,
        PointLight::default(),
        Transform::from_xyz(2.0, 1.0, 0.0),
    ));
    commands.spawn((
        Lamp::FillB,
        PointLight::default(),
        Transform::from_xyz(-2.0, 1.0, 0.0),
    ));

    commands.spawn((
        SkyOrbit,
        StarField {
            capacity: 5000,
            spawn_radius: 5000.0,
            ..default()
        },
    ));

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::new(Vec3::Y, Vec2::new(1000.0, 1000.0)))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::WHITE,
            cull_mode: None,
            ..default()
        })),
        Transform::default(),
    ));
}

/// No-op sinks for the preview simulation; the plotted values are read from
/// the controller state instead.
struct NullSinks;

impl StarFieldSink for NullSinks {
    fn count(&self) -> u32 {
        0
    }
    fn visible(&self) -> bool {
        false
    }
    fn set_count(&mut self, _: u32) {}
    fn set_visible(&mut self, _: bool) {}
}

impl LampSink for NullSinks {
    fn intensity(&self, _: Lamp) -> f32 {
        0.0
    }
    fn set_intensity(&mut self, _: Lamp, _: f32) {}
}

impl AtmosphereSink for NullSinks {
    fn thickness(&self) -> f32 {
        0.0
    }
    fn set_thickness(&mut self, _: f32) {}
}

impl AmbienceSink for NullSinks {
    fn day_volume(&self) -> f32 {
        0.0
    }
    fn night_volume(&self) -> f32 {
        0.0
    }
    fn set_day_volume(&mut self, _: f32) {}
    fn set_night_volume(&mut self, _: f32) {}
}

#[derive(Default)]
struct CycleTrace {
    star_fill: Vec<[f64; 2]>,
    day_volume: Vec<[f64; 2]>,
    night_volume: Vec<[f64; 2]>,
    elevation: Vec<[f64; 2]>,
}

/// Run the whole cycle headlessly with the given config: half a revolution
/// down from the zenith, half back up, recording the interpolated values
/// per step.
fn simulate_cycle(config: &CycleConfig) -> CycleTrace {
    let mut controller = DayNightController::new(config.clone());
    controller.state.reset_elevation(90.0);

    let steps = 720;
    let mut trace = CycleTrace::default();
    for i in 1..=steps {
        let fraction = i as f32 / steps as f32;
        let elevation = if fraction <= 0.5 {
            90.0 - 360.0 * fraction
        } else {
            -90.0 + 360.0 * (fraction - 0.5)
        };

        let (mut stars, mut lamps, mut haze, mut ambience) =
            (NullSinks, NullSinks, NullSinks, NullSinks);
        controller.tick(elevation, &mut stars, &mut lamps, &mut haze, &mut ambience);

        let x = fraction as f64;
        trace
            .star_fill
            .push([x, (controller.state.star_count / config.star_ceiling) as f64]);
        trace
            .day_volume
            .push([x, controller.state.day_volume as f64]);
        trace
            .night_volume
            .push([x, controller.state.night_volume as f64]);
        trace.elevation.push([x, (elevation / 180.0) as f64]);
    }
    trace
}

fn ui_system(
    mut contexts: EguiContexts,
    mut controller: ResMut<DayNightController>,
    mut stashed_speed: Local<Option<f32>>,
    q_body: Query<&CelestialBody>,
) {
    egui::Window::new("Sky Cycle Tuning").show(contexts.ctx_mut(), |ui| {
        ui.heading("Orbit");
        ui.add(
            egui::Slider::new(&mut controller.config.orbit_speed_deg_per_sec, -30.0..=30.0)
                .text("Orbit Speed (°/s)"),
        );
        let paused = *stashed_speed;
        if ui
            .button(if paused.is_some() { "Play" } else { "Pause" })
            .clicked()
        {
            match paused {
                Some(speed) => {
                    controller.config.orbit_speed_deg_per_sec = speed;
                    *stashed_speed = None;
                }
                None => {
                    *stashed_speed = Some(controller.config.orbit_speed_deg_per_sec);
                    controller.config.orbit_speed_deg_per_sec = 0.0;
                }
            }
        }

        ui.separator();
        ui.heading("Windows");
        ui.add(
            egui::Slider::new(&mut controller.config.star_band.min_deg, -90.0..=90.0)
                .text("Star Band Min (°)"),
        );
        ui.add(
            egui::Slider::new(&mut controller.config.star_band.max_deg, -90.0..=90.0)
                .text("Star Band Max (°)"),
        );
        ui.add(
            egui::Slider::new(&mut controller.config.sound_dusk_band.min_deg, -90.0..=90.0)
                .text("Dusk Sound Band Min (°)"),
        );
        ui.add(
            egui::Slider::new(&mut controller.config.sound_dusk_band.max_deg, -90.0..=90.0)
                .text("Dusk Sound Band Max (°)"),
        );
        ui.add(
            egui::Slider::new(&mut controller.config.sound_dawn_band.min_deg, -90.0..=90.0)
                .text("Dawn Sound Band Min (°)"),
        );
        ui.add(
            egui::Slider::new(&mut controller.config.sound_dawn_band.max_deg, -90.0..=90.0)
                .text("Dawn Sound Band Max (°)"),
        );

        ui.separator();
        ui.heading("Ramps");
        ui.add(
            egui::Slider::new(&mut controller.config.star_gain_per_degree, 0.0..=200.0)
                .text("Star Gain (per °)"),
        );
        ui.add(
            egui::Slider::new(&mut controller.config.star_loss_per_degree, 0.0..=200.0)
                .text("Star Loss (per °)"),
        );
        ui.add(
            egui::Slider::new(&mut controller.config.haze_step, 0.0..=0.01)
                .logarithmic(true)
                .text("Haze Step (per tick)"),
        );
        ui.add(
            egui::Slider::new(&mut controller.config.fade_step, 0.0..=0.01)
                .logarithmic(true)
                .text("Fade Step (per tick)"),
        );

        ui.separator();
        ui.heading("Live State");
        let elevation = q_body
            .single()
            .map(|body| body.elevation_deg)
            .unwrap_or(controller.state.current_elevation);
        ui.label(format!("Elevation: {:.1}°", elevation));
        ui.label(format!(
            "Stars: {:.0} ({})",
            controller.state.star_count,
            if controller.state.stars_visible {
                "shown"
            } else {
                "hidden"
            }
        ));
        ui.label(format!("Haze: {:.4}", controller.state.haze_thickness));
        ui.label(format!(
            "Volumes: day {:.3} / night {:.3}",
            controller.state.day_volume, controller.state.night_volume
        ));
        if ui.button("Restart Cycle").clicked() {
            let config = controller.config.clone();
            controller.state = CycleState::initial(&config);
            controller.state.reset_elevation(elevation);
        }

        ui.separator();
        ui.heading("Cycle Preview (current settings)");

        let trace = simulate_cycle(&controller.config);
        let star_line = Line::new("Star fill (0-1)", trace.star_fill);
        let day_line = Line::new("Day volume", trace.day_volume);
        let night_line = Line::new("Night volume", trace.night_volume);
        let elevation_line = Line::new("Elevation (×180°)", trace.elevation);

        Plot::new("cycle_preview_plot")
            .legend(egui_plot::Legend::default())
            .view_aspect(2.0)
            .set_margin_fraction(egui::vec2(0.1, 0.1))
            .x_axis_label("Cycle Fraction (0 = zenith, 0.5 = nadir)")
            .y_axis_label("Normalized Value")
            .show(ui, |plot_ui| {
                plot_ui.line(star_line);
                plot_ui.line(day_line);
                plot_ui.line(night_line);
                plot_ui.line(elevation_line);
            });
    });
}
