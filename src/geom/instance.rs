//! Instance transforms.

use crate::util::{Error, Mat4, Ray, Result, Vec3};

/// One placement of a mesh in model space.
///
/// The inverse is computed once at construction; a matrix that cannot be
/// inverted never becomes an `Instance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instance {
    transform: Mat4,
    inverse: Mat4,
}

impl Instance {
    /// Validate and invert `transform`.
    pub fn new(transform: Mat4) -> Result<Self> {
        let determinant = transform.determinant();
        if determinant == 0.0 || !determinant.is_finite() {
            return Err(Error::NonInvertibleTransform { determinant });
        }
        let inverse = transform.inverse();
        if !inverse.is_finite() {
            return Err(Error::NonInvertibleTransform { determinant });
        }
        Ok(Self { transform, inverse })
    }

    #[inline]
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    #[inline]
    pub fn inverse(&self) -> &Mat4 {
        &self.inverse
    }

    /// Carry a model-space ray into the mesh's local space.
    #[inline]
    pub fn to_local(&self, ray: &Ray) -> Ray {
        ray.transformed(&self.inverse)
    }

    #[inline]
    pub fn to_model_point(&self, p: Vec3) -> Vec3 {
        self.transform.transform_point3(p)
    }
}
