//! Model-level picking across meshes and instances.

use std::sync::Arc;

use crate::bvh::MeshBvh;
use crate::util::{min_distance, Aabb, Mat4, Ray, Vec3};

use super::Instance;

/// Identity and position of the closest hit in a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Distance along the model-space ray, in units of its direction.
    pub t: f32,
    /// Mesh position in [`Model::meshes`].
    pub mesh: usize,
    /// Position in the transform list the mesh was added with.
    pub instance: usize,
    /// Original triangle number within the mesh.
    pub triangle: u32,
    pub u: f32,
    pub v: f32,
    /// Hit position in model space.
    pub point: Vec3,
}

#[derive(Debug, Clone)]
struct PlacedInstance {
    index: usize,
    instance: Instance,
    bounds: Aabb,
}

/// A picking-ready mesh with its placements.
#[derive(Debug, Clone)]
pub struct ModelMesh {
    name: String,
    mesh: Arc<MeshBvh>,
    instances: Vec<PlacedInstance>,
    skipped_instances: usize,
}

impl ModelMesh {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mesh(&self) -> &Arc<MeshBvh> {
        &self.mesh
    }

    /// Number of usable instances.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Instances dropped because their matrix could not be inverted.
    pub fn skipped_instances(&self) -> usize {
        self.skipped_instances
    }

    /// Instance by its position in the original transform list.
    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.instances
            .iter()
            .find(|p| p.index == index)
            .map(|p| &p.instance)
    }
}

/// Immutable set of meshes answering closest-hit queries.
#[derive(Debug, Clone, Default)]
pub struct Model {
    meshes: Vec<ModelMesh>,
    bounds: Aabb,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mesh placed by each of `transforms`; returns its mesh index.
    ///
    /// Singular transforms are skipped with a warning; the remaining
    /// instances keep their original positions as instance ids.
    pub fn add_mesh(&mut self, name: impl Into<String>, mesh: Arc<MeshBvh>, transforms: &[Mat4]) -> usize {
        let name = name.into();
        let local_bounds = mesh.bounds();
        let mut instances = Vec::with_capacity(transforms.len());
        let mut skipped_instances = 0;

        for (index, transform) in transforms.iter().enumerate() {
            match Instance::new(*transform) {
                Ok(instance) => {
                    let bounds = local_bounds.transformed(instance.transform());
                    self.bounds.merge(&bounds);
                    instances.push(PlacedInstance { index, instance, bounds });
                }
                Err(err) => {
                    tracing::warn!(mesh = %name, instance = index, "Skipping instance: {err}");
                    skipped_instances += 1;
                }
            }
        }

        self.meshes.push(ModelMesh {
            name,
            mesh,
            instances,
            skipped_instances,
        });
        self.meshes.len() - 1
    }

    pub fn meshes(&self) -> &[ModelMesh] {
        &self.meshes
    }

    pub fn mesh(&self, index: usize) -> Option<&ModelMesh> {
        self.meshes.get(index)
    }

    pub fn mesh_by_name(&self, name: &str) -> Option<(usize, &ModelMesh)> {
        self.meshes.iter().enumerate().find(|(_, m)| m.name == name)
    }

    /// Union of every instance's transformed mesh bounds.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn instance_count(&self) -> usize {
        self.meshes.iter().map(ModelMesh::instance_count).sum()
    }

    /// Closest hit distance, `+inf` when nothing is hit.
    pub fn closest_hit(&self, ray: &Ray) -> f32 {
        self.pick(ray).map_or(f32::INFINITY, |hit| hit.t)
    }

    /// Closest hit with mesh, instance and triangle identity.
    ///
    /// Misses of the whole-model box return at once. Each instance is
    /// queried with the ray carried into mesh-local space; the local
    /// direction is not renormalised, so `t` is comparable across
    /// instances and meshes.
    pub fn pick(&self, ray: &Ray) -> Option<PickHit> {
        if !self.bounds.has_intersection(ray) {
            return None;
        }

        let mut best: Option<PickHit> = None;
        let mut closest = f32::INFINITY;
        for (mesh_index, model_mesh) in self.meshes.iter().enumerate() {
            for placed in &model_mesh.instances {
                match placed.bounds.intersect_ray(ray) {
                    Some((t_near, _)) if t_near <= closest => {}
                    _ => continue,
                }

                let local = placed.instance.to_local(ray);
                if let Some(hit) = model_mesh.mesh.closest_hit_record(&local, closest) {
                    closest = min_distance(closest, hit.t);
                    best = Some(PickHit {
                        t: hit.t,
                        mesh: mesh_index,
                        instance: placed.index,
                        triangle: hit.triangle,
                        u: hit.u,
                        v: hit.v,
                        point: ray.at(hit.t),
                    });
                }
            }
        }
        best
    }
}
