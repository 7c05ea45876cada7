//! Body registry and seeded setup

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bodies::{BodyIndex, Prism, PrismKind};
use crate::core::SimulationConfig;
use crate::foundation::math::{Transform, Vec3};
use crate::simulation::SimulationError;

/// Fewest and most cross-section vertices a generated prism may have
const POINT_COUNT_RANGE: (f32, f32) = (3.0, 10.0);

/// Owns every simulated prism and its presentation handle
///
/// Bodies are created once and never removed, so a [`BodyIndex`] stays valid
/// for the lifetime of the registry.
#[derive(Debug, Clone, Default)]
pub struct BodyRegistry {
    prisms: Vec<Prism>,
    handles: Vec<Transform>,
}

impl BodyRegistry {
    /// Generate `config.body_count` random prisms inside the configured region
    ///
    /// The same configuration (seed included) always yields the same bodies.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Config`] when the configuration fails
    /// validation.
    pub fn generate(config: &SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut registry = Self {
            prisms: Vec::with_capacity(config.body_count),
            handles: Vec::with_capacity(config.body_count),
        };

        for _ in 0..config.body_count {
            let (prism, handle) = random_prism(config, &mut rng)?;
            registry.prisms.push(prism);
            registry.handles.push(handle);
        }

        log::info!(
            "Generated {} prisms (seed {}, region ±{}/±{})",
            registry.len(),
            config.seed,
            config.region_radius_xz,
            config.region_radius_y
        );
        Ok(registry)
    }

    /// Wrap hand-built prisms; each handle starts at its prism's centroid
    #[must_use]
    pub fn from_prisms(prisms: Vec<Prism>) -> Self {
        let handles = prisms.iter().map(|p| Transform::from_position(p.centroid())).collect();
        Self { prisms, handles }
    }

    /// Number of bodies
    #[must_use]
    pub fn len(&self) -> usize {
        self.prisms.len()
    }

    /// Whether the registry holds no bodies
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prisms.is_empty()
    }

    /// Prism geometry by index
    #[must_use]
    pub fn prism(&self, index: BodyIndex) -> Option<&Prism> {
        self.prisms.get(index)
    }

    /// Presentation handle by index
    #[must_use]
    pub fn handle(&self, index: BodyIndex) -> Option<&Transform> {
        self.handles.get(index)
    }

    /// All prisms in index order
    #[must_use]
    pub fn prisms(&self) -> &[Prism] {
        &self.prisms
    }

    /// All handles in index order
    #[must_use]
    pub fn handles(&self) -> &[Transform] {
        &self.handles
    }

    /// Indexing positions (cross-section centroids) in index order
    #[must_use]
    pub fn positions(&self) -> Vec<Vec3> {
        self.prisms.iter().map(Prism::centroid).collect()
    }

    /// Move a body's points and its handle together
    ///
    /// Returns `false` if `index` is out of range.
    pub fn translate(&mut self, index: BodyIndex, delta: Vec3) -> bool {
        match (self.prisms.get_mut(index), self.handles.get_mut(index)) {
            (Some(prism), Some(handle)) => {
                prism.translate(delta);
                handle.translate(delta);
                true
            }
            _ => false,
        }
    }
}

/// Draw one prism; the draw order is point count, yaw, scale, position, kind
fn random_prism(config: &SimulationConfig, rng: &mut StdRng) -> Result<(Prism, Transform), SimulationError> {
    let (fewest, most) = POINT_COUNT_RANGE;
    // Bounded to [3, 10] by construction
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let point_count = rng.gen::<f32>().mul_add(most - fewest, fewest).round() as usize;

    let yaw = rng.gen::<f32>() * 360.0;

    let floor = config.min_scale_fraction;
    let scale = Vec3::new(
        signed_uniform(rng, config.max_scale_xz, floor),
        signed_uniform(rng, config.max_scale_y, floor),
        signed_uniform(rng, config.max_scale_xz, floor),
    );

    let position = Vec3::new(
        signed_uniform(rng, config.region_radius_xz, 0.0),
        signed_uniform(rng, config.region_radius_y, 0.0),
        signed_uniform(rng, config.region_radius_xz, 0.0),
    );

    let kind = if rng.gen::<f32>() < 0.5 {
        PrismKind::Regular
    } else {
        PrismKind::Irregular
    };

    let handle = Transform::from_position_yaw_scale(position, yaw, scale);
    let points = kind
        .cross_section(point_count, rng)
        .into_iter()
        .map(|p| handle.transform_point(p))
        .collect();

    let prism = Prism::new(points, 0.0, scale.y.abs(), kind)?;
    Ok((prism, handle))
}

/// Uniform in `[-max, max]`, with magnitudes below `floor * max` pushed out
/// to the floor
fn signed_uniform(rng: &mut StdRng, max: f32, floor: f32) -> f32 {
    let value = (rng.gen::<f32>() - 0.5) * 2.0 * max;
    let min_magnitude = floor * max;
    if value.abs() < min_magnitude {
        min_magnitude.copysign(value)
    } else {
        value
    }
}
