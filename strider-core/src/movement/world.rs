use glam::DVec3;

/// Terrain height lookup injected into the simulator. Implementations must
/// be pure: identical coordinates always return identical heights, or the
/// two roles will disagree about who is standing on what.
pub trait WorldQuery {
    fn height_at(&self, x: f64, z: f64) -> f64;
}

/// Default world when no query is supplied: flat ground at height 0.
pub struct FlatGround;

impl WorldQuery for FlatGround {
    fn height_at(&self, _x: f64, _z: f64) -> f64 {
        0.0
    }
}

/// Surface normal from central differences of the height field.
pub fn surface_normal(world: &dyn WorldQuery, x: f64, z: f64) -> DVec3 {
    const EPSILON: f64 = 0.05;
    let dx = world.height_at(x - EPSILON, z) - world.height_at(x + EPSILON, z);
    let dz = world.height_at(x, z - EPSILON) - world.height_at(x, z + EPSILON);
    DVec3::new(dx, 2.0 * EPSILON, dz).normalize()
}
