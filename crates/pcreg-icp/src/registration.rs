//! Outer registration loop: nearest-neighbor correspondence search plus
//! Bingham filter pose updates until convergence.

use pcreg_3d::pointcloud::PointCloud;

use crate::bingham::{bingham_kf, BinghamState};
use crate::error::IcpError;
use crate::kdtree::KdTree;
use crate::search::kd_search;

/// Convergence thresholds for [`register_bingham`].
#[derive(Debug, Clone)]
pub struct RegistrationCriteria {
    /// Maximum number of iterations to perform.
    pub max_iterations: usize,
    /// Convergence tolerance on the translation change between two
    /// consecutive pose estimates.
    pub translation_tolerance: f64,
    /// Convergence tolerance on the Euler-angle change between two
    /// consecutive pose estimates.
    pub rotation_tolerance: f64,
}

impl Default for RegistrationCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            translation_tolerance: 1e-6,
            rotation_tolerance: 1e-6,
        }
    }
}

/// Result of a registration run.
///
/// The pose maps the moving cloud onto the fixed frame.
#[derive(Debug, Clone)]
pub struct RegistrationResult {
    /// Estimated pose: translation x, y, z then ZYX Euler angles.
    pub xreg: [f64; 6],
    /// The total number of iterations performed.
    pub num_iterations: usize,
    /// Mean correspondence distance at the last iteration.
    pub residual: f64,
}

/// Register `moving` onto `fixed` using nearest-neighbor correspondences
/// and Bingham filter pose updates.
///
/// # Arguments
///
/// * `moving` - Cloud to align.
/// * `fixed` - Reference cloud; a k-d tree is built from it once and
///   reused read-only across all iterations.
/// * `inlier_ratio` - Fraction of closest-ranked correspondences fed to
///   the filter each iteration, in `(0, 1]`.
/// * `criteria` - Iteration cap and convergence tolerances.
pub fn register_bingham(
    moving: &PointCloud,
    fixed: &PointCloud,
    inlier_ratio: f64,
    criteria: &RegistrationCriteria,
) -> Result<RegistrationResult, IcpError> {
    if fixed.is_empty() {
        return Err(IcpError::EmptyTree);
    }

    let tree = KdTree::from_points(fixed.points());

    let mut state = BinghamState::flat_prior();
    let mut xreg = [0.0; 6];
    let mut residual = f64::INFINITY;
    let mut num_iterations = 0;

    for iteration in 0..criteria.max_iterations {
        let search = kd_search(moving.points(), &tree, inlier_ratio, &xreg)?;

        let kept = search.pc.len();
        if kept < 2 {
            // A single correspondence cannot form a difference measurement.
            residual = search.res;
            num_iterations = iteration + 1;
            break;
        }

        // Consecutive correspondence pairs become the filter's difference
        // measurements.
        let p1c = &search.pc[..kept - 1];
        let p2c = &search.pc[1..];
        let p1r = &search.pr[..kept - 1];
        let p2r = &search.pr[1..];

        // Measurement noise grows with the current residual, so badly
        // aligned early iterations count for less.
        let rmag = 1e-4 + search.res * search.res;

        let update = bingham_kf(&state, rmag, p1c, p1r, p2c, p2r)?;
        state = update.state;

        let delta_translation = ((update.xreg[0] - xreg[0]).powi(2)
            + (update.xreg[1] - xreg[1]).powi(2)
            + (update.xreg[2] - xreg[2]).powi(2))
        .sqrt();
        let delta_rotation = ((update.xreg[3] - xreg[3]).powi(2)
            + (update.xreg[4] - xreg[4]).powi(2)
            + (update.xreg[5] - xreg[5]).powi(2))
        .sqrt();

        xreg = update.xreg;
        residual = search.res;
        num_iterations = iteration + 1;

        log::debug!(
            "iteration {}: residual {}, pose {:?}",
            iteration,
            residual,
            xreg
        );

        if delta_translation < criteria.translation_tolerance
            && delta_rotation < criteria.rotation_tolerance
        {
            log::debug!("registration converged in {} iterations", num_iterations);
            break;
        }
    }

    Ok(RegistrationResult {
        xreg,
        num_iterations,
        residual,
    })
}
