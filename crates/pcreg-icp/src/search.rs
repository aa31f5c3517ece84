//! Batch nearest-neighbor correspondence search under a candidate pose.
//!
//! Each query point is transformed by the current pose estimate before the
//! tree descent; reported query points stay in their original frame so the
//! downstream pose estimator sees untransformed measurements.

use pcreg_3d::linalg::{euclidean_distance, transform_points3d};
use pcreg_3d::transforms::pose_to_rotation_translation;

use crate::error::IcpError;
use crate::kdtree::{KdNormalTree, KdTree};

/// Correspondences from [`kd_search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Matched reference points, closest pairs first.
    pub pc: Vec<[f64; 3]>,
    /// Query points paired with `pc`, in their original untransformed
    /// frame and the same order.
    pub pr: Vec<[f64; 3]>,
    /// Mean distance over the kept pairs.
    pub res: f64,
}

/// Correspondences plus per-pair surface normals from
/// [`kd_search_normals`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalSearchResult {
    /// Mean point distance over the kept pairs.
    pub res_points: f64,
    /// Mean normal misalignment over the kept pairs, independent of the
    /// point distances.
    pub res_normals: f64,
    /// Matched reference points, closest pairs first.
    pub pc: Vec<[f64; 3]>,
    /// Query points paired with `pc`, in their original frame.
    pub pr: Vec<[f64; 3]>,
    /// Reference-cloud normals at each matched point's stored index,
    /// aligned with `pc`.
    pub normalc: Vec<[f64; 3]>,
    /// Moving-cloud normals at each query's own index, aligned with `pr`.
    pub normalr: Vec<[f64; 3]>,
}

/// Find for every query its nearest stored point and keep the
/// closest-ranked fraction.
///
/// # Arguments
///
/// * `targets` - Query point cloud.
/// * `tree` - Tree built from the reference cloud.
/// * `inlier_ratio` - Fraction of closest-ranked pairs to keep, in
///   `(0, 1]`. At least one pair is always kept.
/// * `xreg` - 6-parameter pose applied to every query before the descent:
///   translation x, y, z then ZYX Euler angles.
///
/// # Returns
///
/// Matched reference points, the corresponding untransformed queries, and
/// the mean kept distance. Both sequences are ordered by ascending match
/// distance; ties keep the original query order.
pub fn kd_search(
    targets: &[[f64; 3]],
    tree: &KdTree,
    inlier_ratio: f64,
    xreg: &[f64],
) -> Result<SearchResult, IcpError> {
    validate(targets.len(), tree.len(), inlier_ratio)?;

    let transformed = apply_pose(targets, xreg)?;
    let ranked = rank_matches(&transformed, |p| tree.nearest(p), inlier_ratio)?;

    let mut pc = Vec::with_capacity(ranked.matches.len());
    let mut pr = Vec::with_capacity(ranked.matches.len());
    for &(query, node, _) in &ranked.matches {
        pc.push(tree.point_of(node));
        pr.push(targets[query]);
    }

    Ok(SearchResult {
        pc,
        pr,
        res: ranked.res,
    })
}

/// [`kd_search`] over an index-tagged tree, additionally pairing up the
/// surface normals of both clouds.
///
/// `normal_moving` is indexed by each query's own position in `targets`;
/// `normal_fixed` is indexed by the matched node's stored original-cloud
/// index. Both lookups are validated before any output is built.
pub fn kd_search_normals(
    targets: &[[f64; 3]],
    tree: &KdNormalTree,
    inlier_ratio: f64,
    xreg: &[f64],
    normal_moving: &[[f64; 3]],
    normal_fixed: &[[f64; 3]],
) -> Result<NormalSearchResult, IcpError> {
    validate(targets.len(), tree.len(), inlier_ratio)?;

    if normal_moving.len() != targets.len() {
        return Err(IcpError::DimensionMismatch {
            expected: targets.len(),
            actual: normal_moving.len(),
        });
    }
    if let Some(max_index) = tree.max_source_index() {
        if max_index >= normal_fixed.len() {
            return Err(IcpError::DimensionMismatch {
                expected: max_index + 1,
                actual: normal_fixed.len(),
            });
        }
    }

    let transformed = apply_pose(targets, xreg)?;
    let ranked = rank_matches(&transformed, |p| tree.nearest(p), inlier_ratio)?;

    let kept = ranked.matches.len();
    let mut pc = Vec::with_capacity(kept);
    let mut pr = Vec::with_capacity(kept);
    let mut normalc = Vec::with_capacity(kept);
    let mut normalr = Vec::with_capacity(kept);
    let mut normal_residual_sum = 0.0;
    for &(query, node, _) in &ranked.matches {
        pc.push(tree.point_of(node));
        pr.push(targets[query]);
        let nc = normal_fixed[tree.source_index(node)];
        let nr = normal_moving[query];
        normal_residual_sum += euclidean_distance(&nr, &nc);
        normalc.push(nc);
        normalr.push(nr);
    }

    Ok(NormalSearchResult {
        res_points: ranked.res,
        res_normals: normal_residual_sum / kept as f64,
        pc,
        pr,
        normalc,
        normalr,
    })
}

fn validate(num_targets: usize, tree_len: usize, inlier_ratio: f64) -> Result<(), IcpError> {
    if !(inlier_ratio > 0.0 && inlier_ratio <= 1.0) {
        return Err(IcpError::InvalidInlierRatio(inlier_ratio));
    }
    if tree_len == 0 {
        return Err(IcpError::EmptyTree);
    }
    if num_targets == 0 {
        return Err(IcpError::EmptyTargets);
    }
    Ok(())
}

fn apply_pose(targets: &[[f64; 3]], xreg: &[f64]) -> Result<Vec<[f64; 3]>, IcpError> {
    let (rotation, translation) = pose_to_rotation_translation(xreg)?;
    let mut transformed = vec![[0.0; 3]; targets.len()];
    transform_points3d(targets, &rotation, &translation, &mut transformed)?;
    Ok(transformed)
}

// Kept matches as (query index, arena node index, distance), closest
// first, plus the mean kept distance.
struct RankedMatches {
    matches: Vec<(usize, usize, f64)>,
    res: f64,
}

fn rank_matches(
    transformed: &[[f64; 3]],
    nearest: impl Fn(&[f64; 3]) -> Option<(usize, f64)>,
    inlier_ratio: f64,
) -> Result<RankedMatches, IcpError> {
    let mut matches = Vec::with_capacity(transformed.len());
    for (query, point) in transformed.iter().enumerate() {
        let (node, distance) = nearest(point).ok_or(IcpError::EmptyTree)?;
        matches.push((query, node, distance));
    }

    // Stable sort keeps the original query order among equal distances.
    matches.sort_by(|a, b| a.2.total_cmp(&b.2));
    matches.truncate(keep_count(transformed.len(), inlier_ratio));

    let res = matches.iter().map(|m| m.2).sum::<f64>() / matches.len() as f64;
    Ok(RankedMatches { matches, res })
}

// floor(N * ratio), but never below one kept pair for a nonempty query set.
fn keep_count(num_targets: usize, inlier_ratio: f64) -> usize {
    (((num_targets as f64) * inlier_ratio).floor() as usize).clamp(1, num_targets)
}
