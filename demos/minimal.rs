use bevy::{
    audio::Volume,
    core_pipeline::{bloom::Bloom, tonemapping::Tonemapping},
    pbr::{Atmosphere, AtmosphereSettings, DistanceFog, light_consts::lux},
    prelude::*,
    render::{camera::Exposure, mesh::Mesh3d},
};
use bevy_sky_cycle::{cycle::*, star_field::*, *};

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(SkyCyclePlugin)
        .add_plugins(StarFieldPlugin)
        .insert_resource(DayNightController::new(demo_cycle_config()))
        .add_systems(Startup, (setup_camera_fog, setup_scene))
        .run();
}

fn demo_cycle_config() -> CycleConfig {
    CycleConfig {
        // Full revolution in one minute.
        orbit_speed_deg_per_sec: 6.0,
        day_lamp_levels: LampLevels {
            sun: lux::RAW_SUNLIGHT,
            moon: 0.0,
            fill_a: 1_000_000.0,
            fill_b: 1_000_000.0,
        },
        sun_dim_step: 120.0,
        moon_rise_step: 2.0,
        fill_dim_step: 950.0,
        ..default()
    }
}

fn setup_camera_fog(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(-1.2, 0.15, 0.0).looking_at(Vec3::Y * 0.1, Vec3::Y),
        // HDR is required for atmospheric scattering to be properly applied to the scene
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
    asset_server: Res<AssetServer>,
) {
    // Sun, starting mid-morning; the orbit sweep keeps it pointed at the pivot
    let morning = 30.0_f32 * DEGREES_TO_RADIANS;
    commands.spawn((
        CelestialBody::default(),
        Lamp::Sun,
        DirectionalLight {
            shadows_enabled: true,
            illuminance: lux::RAW_SUNLIGHT,
            ..default()
        },
        Transform::from_xyz(0.0, 100.0 * morning.sin(), -100.0 * morning.cos())
            .looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // Moon on the far side of the same orbit
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

    // Two static fill lights the cycle dims alongside the sun
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

    // Star dome rides the sky rotation
    commands.spawn((
        SkyOrbit,
        StarField {
            capacity: 5000,
            spawn_radius: 5000.0,
            ..default()
        },
    ));

    // Day ambience is split over two channels, night has one
    commands.spawn((
        AudioPlayer::new(asset_server.load("sounds/ambience_birds.ogg")),
        PlaybackSettings::LOOP.with_volume(Volume::Linear(0.5)),
        AmbienceChannel::new(AmbienceGroup::Day),
    ));
    commands.spawn((
        AudioPlayer::new(asset_server.load("sounds/ambience_wind.ogg")),
        PlaybackSettings::LOOP.with_volume(Volume::Linear(0.5)),
        AmbienceChannel::new(AmbienceGroup::Day),
    ));
    commands.spawn((
        AudioPlayer::new(asset_server.load("sounds/ambience_crickets.ogg")),
        PlaybackSettings::LOOP.with_volume(Volume::Linear(0.0)),
        AmbienceChannel::new(AmbienceGroup::Night),
    ));

    let sphere_mesh = meshes.add(Mesh::from(Sphere { radius: 1.0 }));

    // light probe spheres
    commands.spawn((
        Mesh3d(sphere_mesh.clone()),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::WHITE,
            metallic: 1.0,
            perceptual_roughness: 0.0,
            ..default()
        })),
        Transform::from_xyz(-0.3, 0.1, -0.1).with_scale(Vec3::splat(0.05)),
    ));

    commands.spawn((
        Mesh3d(sphere_mesh.clone()),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::WHITE,
            metallic: 0.0,
            perceptual_roughness: 1.0,
            ..default()
        })),
        Transform::from_xyz(-0.3, 0.1, 0.1).with_scale(Vec3::splat(0.05)),
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
