use crate::error::Pcreg3dError;
use crate::linalg::matmul33;

/// Compute the rotation matrix from ZYX Euler angles.
///
/// `angles` holds the rotation about z, then y, then x, composed as
/// `R = Rz(a) * Ry(b) * Rx(c)`. This is the convention used by the
/// 6-parameter pose vectors throughout the library.
///
/// Example:
///
/// ```
/// use pcreg_3d::transforms::euler_zyx_to_rotation_matrix;
///
/// let rotation = euler_zyx_to_rotation_matrix(&[0.0, 0.0, 0.0]);
/// assert_eq!(rotation, [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
/// ```
pub fn euler_zyx_to_rotation_matrix(angles: &[f64; 3]) -> [[f64; 3]; 3] {
    let (sz, cz) = angles[0].sin_cos();
    let (sy, cy) = angles[1].sin_cos();
    let (sx, cx) = angles[2].sin_cos();

    let rz = [[cz, -sz, 0.0], [sz, cz, 0.0], [0.0, 0.0, 1.0]];
    let ry = [[cy, 0.0, sy], [0.0, 1.0, 0.0], [-sy, 0.0, cy]];
    let rx = [[1.0, 0.0, 0.0], [0.0, cx, -sx], [0.0, sx, cx]];

    let mut rzy = [[0.0; 3]; 3];
    matmul33(&rz, &ry, &mut rzy);
    let mut rotation = [[0.0; 3]; 3];
    matmul33(&rzy, &rx, &mut rotation);
    rotation
}

/// Split a 6-parameter pose vector into a rotation matrix and translation.
///
/// The pose layout is `[tx, ty, tz, rz, ry, rx]`: translation first, then
/// ZYX Euler angles.
pub fn pose_to_rotation_translation(
    xreg: &[f64],
) -> Result<([[f64; 3]; 3], [f64; 3]), Pcreg3dError> {
    if xreg.len() != 6 {
        return Err(Pcreg3dError::InvalidPoseDimension(xreg.len()));
    }

    let translation = [xreg[0], xreg[1], xreg[2]];
    let rotation = euler_zyx_to_rotation_matrix(&[xreg[3], xreg[4], xreg[5]]);

    Ok((rotation, translation))
}

/// Compute the rotation matrix from a quaternion in `(w, x, y, z)` order.
///
/// The quaternion is normalized before conversion.
pub fn quaternion_to_rotation_matrix(q: &[f64; 4]) -> [[f64; 3]; 3] {
    let [w, x, y, z] = normalized(q);

    [
        [
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
        ],
        [
            2.0 * (x * y + w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - w * x),
        ],
        [
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        ],
    ]
}

/// Convert a quaternion in `(w, x, y, z)` order to ZYX Euler angles.
///
/// The quaternion is normalized before conversion. The result feeds the
/// angle half of a pose vector, so
/// [`euler_zyx_to_rotation_matrix`] of the output reproduces
/// [`quaternion_to_rotation_matrix`] of the input.
pub fn quaternion_to_euler_zyx(q: &[f64; 4]) -> [f64; 3] {
    let [w, x, y, z] = normalized(q);

    [
        (2.0 * (x * y + w * z)).atan2(w * w + x * x - y * y - z * z),
        (-2.0 * (x * z - w * y)).asin(),
        (2.0 * (y * z + w * x)).atan2(w * w - x * x - y * y + z * z),
    ]
}

fn normalized(q: &[f64; 4]) -> [f64; 4] {
    let magnitude = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if magnitude < f64::MIN_POSITIVE {
        // Degenerate input falls back to the identity orientation.
        return [1.0, 0.0, 0.0, 0.0];
    }
    [
        q[0] / magnitude,
        q[1] / magnitude,
        q[2] / magnitude,
        q[3] / magnitude,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_euler_zyx_quarter_turn_about_z() {
        let rotation = euler_zyx_to_rotation_matrix(&[std::f64::consts::FRAC_PI_2, 0.0, 0.0]);
        let expected = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(rotation[i][j], expected[i][j], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_pose_to_rotation_translation() -> Result<(), Pcreg3dError> {
        let xreg = [1.0, 2.0, 3.0, 0.0, 0.0, 0.0];
        let (rotation, translation) = pose_to_rotation_translation(&xreg)?;
        assert_eq!(translation, [1.0, 2.0, 3.0]);
        assert_eq!(
            rotation,
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
        );
        Ok(())
    }

    #[test]
    fn test_pose_to_rotation_translation_bad_dimension() {
        let result = pose_to_rotation_translation(&[0.0; 5]);
        assert_eq!(result, Err(Pcreg3dError::InvalidPoseDimension(5)));
    }

    #[test]
    fn test_quaternion_identity() {
        let rotation = quaternion_to_rotation_matrix(&[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(
            rotation,
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
        );
        let eul = quaternion_to_euler_zyx(&[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(eul, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_quaternion_euler_consistency() {
        // generic rotation: axis (1, 2, 3) normalized, angle 0.7
        let axis_magnitude = (14.0f64).sqrt();
        let half = 0.35f64;
        let q = [
            half.cos(),
            half.sin() * 1.0 / axis_magnitude,
            half.sin() * 2.0 / axis_magnitude,
            half.sin() * 3.0 / axis_magnitude,
        ];

        let direct = quaternion_to_rotation_matrix(&q);
        let via_euler = euler_zyx_to_rotation_matrix(&quaternion_to_euler_zyx(&q));

        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(direct[i][j], via_euler[i][j], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_quaternion_sign_invariance() {
        let q = [0.9, 0.1, -0.2, 0.3];
        let negated = [-0.9, -0.1, 0.2, -0.3];
        let a = quaternion_to_euler_zyx(&q);
        let b = quaternion_to_euler_zyx(&negated);
        for i in 0..3 {
            assert_relative_eq!(a[i], b[i], epsilon = 1e-12);
        }
    }
}
