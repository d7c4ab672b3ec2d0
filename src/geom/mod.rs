//! Scene geometry for picking.
//!
//! - [`TriangleMesh`] - vertex + index buffers of one mesh
//! - [`Instance`] - validated placement of a mesh in model space
//! - [`Model`] - meshes with their instances, answering closest-hit queries

pub mod instance;
pub mod mesh;
pub mod model;

pub use instance::Instance;
pub use mesh::{TriangleMesh, Vertex};
pub use model::{Model, ModelMesh, PickHit};
