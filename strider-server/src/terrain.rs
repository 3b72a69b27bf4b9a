use strider_core::movement::WorldQuery;

/// One smooth bump in the height field.
pub struct Mound {
    pub x: f64,
    pub z: f64,
    pub radius: f64,
    pub height: f64,
}

/// Server-side terrain: a flat base plane with cosine-falloff mounds. Real
/// deployments swap this for a heightmap loader; the simulator only ever
/// sees the `WorldQuery` trait either way.
pub struct ServerTerrain {
    base_height: f64,
    mounds: Vec<Mound>,
}

impl ServerTerrain {
    pub fn flat() -> ServerTerrain {
        ServerTerrain {
            base_height: 0.0,
            mounds: Vec::new(),
        }
    }

    pub fn with_mounds(mounds: Vec<Mound>) -> ServerTerrain {
        ServerTerrain {
            base_height: 0.0,
            mounds,
        }
    }
}

impl WorldQuery for ServerTerrain {
    fn height_at(&self, x: f64, z: f64) -> f64 {
        let mut height = self.base_height;
        for mound in &self.mounds {
            let distance = ((x - mound.x).powi(2) + (z - mound.z).powi(2)).sqrt();
            if distance < mound.radius {
                let falloff = 0.5 + 0.5 * (std::f64::consts::PI * distance / mound.radius).cos();
                height += mound.height * falloff;
            }
        }
        height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_terrain_is_zero_everywhere() {
        let terrain = ServerTerrain::flat();
        assert_eq!(terrain.height_at(0.0, 0.0), 0.0);
        assert_eq!(terrain.height_at(-500.0, 731.0), 0.0);
    }

    #[test]
    fn mound_peaks_at_center_and_fades_out() {
        let terrain = ServerTerrain::with_mounds(vec![Mound {
            x: 10.0,
            z: 0.0,
            radius: 4.0,
            height: 2.0,
        }]);

        assert!((terrain.height_at(10.0, 0.0) - 2.0).abs() < 1e-12);
        assert!(terrain.height_at(12.0, 0.0) > 0.0);
        assert_eq!(terrain.height_at(20.0, 0.0), 0.0);
    }
}
