// One mesh instance per star. Fine for a few thousand stars; a texture or
// particle pass would scale further.

use bevy::{pbr::NotShadowCaster, prelude::*};
use rand::Rng;

use crate::cycle::StarFieldSink;

pub struct StarFieldPlugin;

impl Plugin for StarFieldPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_star_assets);
        app.add_systems(Update, populate_star_field);
        app.add_systems(Update, apply_star_field);
    }
}

/// A batch of star entities parented under this one. `capacity` entities are
/// materialized up front; `count` and `visible` then say how many of them to
/// show, and whether to show the field at all. The cycle drives the latter
/// two through [`StarFieldSink`].
#[derive(Component, Debug, Clone, PartialEq)]
#[require(Transform, Visibility)]
pub struct StarField {
    pub capacity: u32,
    pub spawn_radius: f32,
    pub count: u32,
    pub visible: bool,
}

impl Default for StarField {
    fn default() -> Self {
        Self {
            capacity: 5000,
            spawn_radius: 500.0,
            count: 0,
            visible: false,
        }
    }
}

impl StarFieldSink for StarField {
    fn count(&self) -> u32 {
        self.count
    }
    fn visible(&self) -> bool {
        self.visible
    }
    fn set_count(&mut self, count: u32) {
        self.count = count;
    }
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

#[derive(Component)]
pub struct Star;

/// Bookkeeping inserted by [`populate_star_field`] recording the batch that
/// was actually built, so per-tick `count` writes do not trigger a rebuild.
#[derive(Component)]
pub struct PopulatedStars {
    capacity: u32,
    spawn_radius: f32,
}

#[derive(Resource)]
pub struct StarFieldAssets {
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
}

fn setup_star_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mesh = meshes.add(Cuboid::new(1.0, 1.0, 1.0));
    let material = materials.add(StandardMaterial {
        base_color: Color::srgba(0.0, 0.0, 0.0, 1.0),
        emissive: LinearRgba::rgb(2.0, 2.0, 2.0),
        alpha_mode: AlphaMode::Add,
        ..default()
    });
    commands.insert_resource(StarFieldAssets { mesh, material });
}

fn populate_star_field(
    mut commands: Commands,
    q_star_field: Query<
        (Entity, &StarField, Option<&PopulatedStars>, Option<&Children>),
        Changed<StarField>,
    >,
    q_star: Query<Entity, With<Star>>,
    assets: Res<StarFieldAssets>,
) {
    for (entity, field, populated, children) in q_star_field.iter() {
        if let Some(populated) = populated {
            if populated.capacity == field.capacity && populated.spawn_radius == field.spawn_radius
            {
                // Only count/visible moved; the batch is already right.
                continue;
            }
        }

        if let Some(children) = children {
            for star in children.iter() {
                if q_star.contains(star) {
                    commands.entity(star).despawn();
                }
            }
        }

        let mut rng = rand::rng();
        for _ in 0..field.capacity {
            let phi = rng.random_range(0.0..2.0 * std::f32::consts::PI);
            let theta = rng.random_range(0.0..std::f32::consts::PI);

            let id = commands
                .spawn((
                    Star,
                    Transform::from_translation(sphere_point(field.spawn_radius, phi, theta))
                        .with_scale(Vec3::ONE * field.spawn_radius / 500.0),
                    Visibility::Hidden,
                    Mesh3d(assets.mesh.clone()),
                    MeshMaterial3d(assets.material.clone()),
                    NotShadowCaster,
                ))
                .id();

            commands.entity(entity).add_child(id);
        }

        commands.entity(entity).insert(PopulatedStars {
            capacity: field.capacity,
            spawn_radius: field.spawn_radius,
        });
    }
}

fn sphere_point(radius: f32, phi: f32, theta: f32) -> Vec3 {
    Vec3::new(
        radius * theta.sin() * phi.cos(),
        radius * theta.cos(),
        radius * theta.sin() * phi.sin(),
    )
}

/// Show the first `count` stars of each field and hide the rest; the field
/// root's own visibility follows the master flag.
fn apply_star_field(
    mut q_star_field: Query<(&StarField, &mut Visibility, Option<&Children>), Without<Star>>,
    mut q_star: Query<&mut Visibility, With<Star>>,
) {
    for (field, mut root_visibility, children) in q_star_field.iter_mut() {
        let wanted_root = if field.visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
        if *root_visibility != wanted_root {
            *root_visibility = wanted_root;
        }

        let Some(children) = children else {
            continue;
        };
        for (index, child) in children.iter().enumerate() {
            let Ok(mut star_visibility) = q_star.get_mut(child) else {
                continue;
            };
            let wanted = if (index as u32) < field.count {
                Visibility::Inherited
            } else {
                Visibility::Hidden
            };
            if *star_visibility != wanted {
                *star_visibility = wanted;
            }
        }
    }
}
