//! # meshpick
//!
//! Ray picking for level editors: a median-split BVH per mesh, built once
//! at load time, and closest-hit queries across every instance of every
//! mesh in a model.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (Aabb, Ray, errors, glam re-exports)
//! - [`geom`] - Meshes, instances and the pickable model
//! - [`bvh`] - Tree builder, node layout and traversal
//! - [`loader`] - Parallel model loading with a shared BVH cache
//! - [`settings`] - Persistent build settings
//! - [`scene`] - JSON scene description
//!
//! ## Example
//!
//! ```ignore
//! use meshpick::prelude::*;
//!
//! let scene = SceneDesc::from_path("level.json")?;
//! let (model, report) = ModelLoader::from_settings(&Settings::load()).load(scene.into_sources());
//!
//! let ray = Ray::from_screen(Vec2::new(0.1, -0.3), &inverse_view_projection).unwrap();
//! if let Some(hit) = model.pick(&ray) {
//!     println!("{} triangle {} at t={}", model.meshes()[hit.mesh].name(), hit.triangle, hit.t);
//! }
//! ```

pub mod util;
pub mod geom;
pub mod bvh;
pub mod loader;
pub mod settings;
pub mod scene;

// Re-export commonly used types
pub use util::{Aabb, Error, MalformedGeometry, Ray, Result};
pub use bvh::{Bvh, BuildOptions, MeshBvh};
pub use geom::{Instance, Model, PickHit, TriangleMesh};
pub use loader::{LoadReport, MeshSource, ModelLoader};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Aabb, Error, MalformedGeometry, Mat4, Ray, Result, Vec2, Vec3};
    pub use crate::bvh::{Bvh, BuildOptions, BvhStats, MeshBvh, MeshHit};
    pub use crate::loader::{new_bvh_cache, BvhCache, LoadReport, MeshSource, ModelLoader};
    pub use crate::settings::Settings;
    pub use crate::scene::SceneDesc;
    pub use crate::geom::*;
}
