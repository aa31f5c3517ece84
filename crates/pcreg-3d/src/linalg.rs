use crate::error::Pcreg3dError;

/// Compute the dot product of two 3D vectors.
#[inline]
pub fn dot_product3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Compute the Euclidean distance between two points.
///
/// Example:
/// ```
/// use pcreg_3d::linalg::euclidean_distance;
///
/// let a = [1.0, 2.0, 3.0];
/// let b = [4.0, 5.0, 6.0];
/// let dst = euclidean_distance(&a, &b);
/// ```
#[inline]
pub fn euclidean_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    squared_distance(a, b).sqrt()
}

/// Compute the squared Euclidean distance between two points.
#[inline]
pub fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

/// Multiply two 3x3 matrices into a pre-allocated output.
pub fn matmul33(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3], m: &mut [[f64; 3]; 3]) {
    for (i, row) in m.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
}

/// Rotate and translate a single point.
#[inline]
pub fn transform_point3d(
    point: &[f64; 3],
    rotation: &[[f64; 3]; 3],
    translation: &[f64; 3],
) -> [f64; 3] {
    [
        dot_product3(&rotation[0], point) + translation[0],
        dot_product3(&rotation[1], point) + translation[1],
        dot_product3(&rotation[2], point) + translation[2],
    ]
}

/// Transform a set of points using a rotation and translation.
///
/// # Arguments
///
/// * `src_points` - A set of points to be transformed.
/// * `rotation` - A rotation matrix.
/// * `translation` - A translation vector.
/// * `dst_points` - A pre-allocated buffer of the same size as the source.
///
/// Example:
///
/// ```
/// use pcreg_3d::linalg::transform_points3d;
///
/// let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
/// let rotation = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
/// let translation = [0.0, 0.0, 0.0];
/// let mut dst_points = vec![[0.0; 3]; src_points.len()];
/// transform_points3d(&src_points, &rotation, &translation, &mut dst_points).unwrap();
/// ```
pub fn transform_points3d(
    src_points: &[[f64; 3]],
    rotation: &[[f64; 3]; 3],
    translation: &[f64; 3],
    dst_points: &mut [[f64; 3]],
) -> Result<(), Pcreg3dError> {
    if src_points.len() != dst_points.len() {
        return Err(Pcreg3dError::LengthMismatch(
            src_points.len(),
            dst_points.len(),
        ));
    }

    for (dst, src) in dst_points.iter_mut().zip(src_points.iter()) {
        *dst = transform_point3d(src, rotation, translation);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_points3d_identity() -> Result<(), Pcreg3dError> {
        let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
        let rotation = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let translation = [0.0, 0.0, 0.0];
        let mut dst_points = vec![[0.0; 3]; src_points.len()];
        transform_points3d(&src_points, &rotation, &translation, &mut dst_points)?;

        assert_eq!(dst_points, src_points);

        Ok(())
    }

    #[test]
    fn test_transform_points3d_rotation_translation() -> Result<(), Pcreg3dError> {
        // quarter turn about z plus a shift
        let src_points = vec![[1.0, 0.0, 0.0]];
        let rotation = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        let translation = [1.0, 2.0, 3.0];
        let mut dst_points = vec![[0.0; 3]];
        transform_points3d(&src_points, &rotation, &translation, &mut dst_points)?;

        assert_relative_eq!(dst_points[0][0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(dst_points[0][1], 3.0, epsilon = 1e-12);
        assert_relative_eq!(dst_points[0][2], 3.0, epsilon = 1e-12);

        Ok(())
    }

    #[test]
    fn test_transform_points3d_length_mismatch() {
        let src_points = vec![[0.0; 3]; 2];
        let mut dst_points = vec![[0.0; 3]; 3];
        let result = transform_points3d(
            &src_points,
            &[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            &[0.0; 3],
            &mut dst_points,
        );
        assert_eq!(result, Err(Pcreg3dError::LengthMismatch(2, 3)));
    }

    #[test]
    fn test_matmul33_identity() {
        let a = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let eye = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let mut m = [[0.0; 3]; 3];
        matmul33(&a, &eye, &mut m);
        assert_eq!(m, a);
    }

    #[test]
    fn test_euclidean_distance() {
        let a = [0.0, 0.0, 0.0];
        let b = [3.0, 4.0, 0.0];
        assert_relative_eq!(euclidean_distance(&a, &b), 5.0, epsilon = 1e-12);
    }
}
