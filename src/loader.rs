//! Load-time BVH construction for a whole model.
//!
//! Meshes are built independently, so the build phase runs on the rayon
//! pool. Built trees can be shared through a [`BvhCache`] keyed by mesh
//! name, letting a reload skip meshes that did not change. An entry is
//! only reused when its buffers and build options match the source; a
//! stale entry is rebuilt and replaced.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::bvh::{BuildOptions, MeshBvh};
use crate::geom::{Model, TriangleMesh};
use crate::settings::Settings;
use crate::util::{MalformedGeometry, Mat4};

/// Thread-safe cache of built mesh trees
pub type BvhCache = Arc<Mutex<HashMap<String, Arc<MeshBvh>>>>;

/// Create a new empty BVH cache
pub fn new_bvh_cache() -> BvhCache {
    Arc::new(Mutex::new(HashMap::new()))
}

/// One mesh as it arrives from the scene, with its placements.
#[derive(Debug, Clone)]
pub struct MeshSource {
    pub name: String,
    pub mesh: TriangleMesh,
    pub transforms: Vec<Mat4>,
}

impl MeshSource {
    pub fn new(name: impl Into<String>, mesh: TriangleMesh, transforms: Vec<Mat4>) -> Self {
        Self {
            name: name.into(),
            mesh,
            transforms,
        }
    }
}

/// What the loader left out.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Meshes whose buffers failed validation.
    pub rejected: Vec<(String, MalformedGeometry)>,
    /// Instances dropped for singular transforms, across all meshes.
    pub skipped_instances: usize,
    /// Meshes taken from the cache instead of rebuilt.
    pub cache_hits: usize,
    /// Cache entries replaced because the mesh or options changed.
    pub stale_entries: usize,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.skipped_instances == 0
    }
}

/// Builds a [`Model`] from mesh sources.
#[derive(Debug, Clone)]
pub struct ModelLoader {
    options: BuildOptions,
    parallel: bool,
    cache: Option<BvhCache>,
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new(BuildOptions::default())
    }
}

/// Build result for one source, in source order
enum Built {
    Ready(String, Arc<MeshBvh>, Vec<Mat4>),
    Rejected(String, MalformedGeometry),
}

impl ModelLoader {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            parallel: true,
            cache: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            options: settings.build_options(),
            parallel: settings.parallel_build,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: BvhCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build every mesh's tree and place its instances.
    ///
    /// Malformed meshes are reported and left out; they never reach the
    /// model. Mesh indices in the result follow source order with the
    /// rejected ones removed.
    #[tracing::instrument(skip_all, fields(meshes = sources.len()))]
    pub fn load(&self, sources: Vec<MeshSource>) -> (Model, LoadReport) {
        let mut report = LoadReport::default();

        // Phase 1: Split cache hits from meshes that need a build
        let mut slots: Vec<Option<Built>> = Vec::with_capacity(sources.len());
        let mut tasks = Vec::new();
        for source in sources {
            let cached = self.cache.as_ref().and_then(|c| c.lock().get(&source.name).cloned());
            let cached = match cached {
                Some(mesh) if mesh.is_built_from(&source.mesh, &self.options) => Some(mesh),
                Some(_) => {
                    tracing::debug!(mesh = %source.name, "Cached BVH is stale, rebuilding");
                    report.stale_entries += 1;
                    None
                }
                None => None,
            };
            match cached {
                Some(mesh) => {
                    report.cache_hits += 1;
                    slots.push(Some(Built::Ready(source.name, mesh, source.transforms)));
                }
                None => {
                    tasks.push((slots.len(), source));
                    slots.push(None);
                }
            }
        }

        // Phase 2: Build trees (CPU-bound, independent per mesh)
        let build = |(slot, source): (usize, MeshSource)| {
            let MeshSource { name, mesh, transforms } = source;
            let built = match MeshBvh::build(mesh, &self.options) {
                Ok(mesh) => {
                    let mesh = Arc::new(mesh);
                    if let Some(cache) = &self.cache {
                        cache.lock().insert(name.clone(), Arc::clone(&mesh));
                    }
                    Built::Ready(name, mesh, transforms)
                }
                Err(err) => {
                    if let Some(cache) = &self.cache {
                        cache.lock().remove(&name);
                    }
                    Built::Rejected(name, err)
                }
            };
            (slot, built)
        };
        let built: Vec<(usize, Built)> = if self.parallel {
            tasks.into_par_iter().map(build).collect()
        } else {
            tasks.into_iter().map(build).collect()
        };
        for (slot, result) in built {
            slots[slot] = Some(result);
        }

        // Phase 3: Combine in source order
        let mut model = Model::new();
        for result in slots.into_iter().flatten() {
            match result {
                Built::Ready(name, mesh, transforms) => {
                    tracing::debug!(mesh = %name, stats = %mesh.stats(), "BVH ready");
                    let index = model.add_mesh(name, mesh, &transforms);
                    report.skipped_instances += model.meshes()[index].skipped_instances();
                }
                Built::Rejected(name, err) => {
                    tracing::warn!(mesh = %name, "Skipping malformed mesh: {err}");
                    report.rejected.push((name, err));
                }
            }
        }

        tracing::debug!(
            meshes = model.meshes().len(),
            instances = model.instance_count(),
            rejected = report.rejected.len(),
            cache_hits = report.cache_hits,
            stale_entries = report.stale_entries,
            "Model loaded"
        );
        (model, report)
    }
}
