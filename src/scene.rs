//! JSON scene description used by the CLI.
//!
//! ```json
//! { "meshes": [ { "name": "floor",
//!                 "positions": [[0,0,0],[1,0,0],[0,1,0]],
//!                 "indices": [0,1,2],
//!                 "instances": [[1,0,0,0, 0,1,0,0, 0,0,1,0, 0,0,-2,1]] } ] }
//! ```
//!
//! Instance matrices are column-major, as glam serialises `Mat4`. A mesh
//! without an `instances` field is placed once at the origin.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::geom::TriangleMesh;
use crate::loader::MeshSource;
use crate::util::{Error, Mat4, Result, Vec3};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDesc {
    #[serde(default)]
    pub meshes: Vec<MeshDesc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDesc {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    #[serde(default = "identity_instances")]
    pub instances: Vec<Mat4>,
}

fn identity_instances() -> Vec<Mat4> {
    vec![Mat4::IDENTITY]
}

impl SceneDesc {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Hand the meshes over to a [`crate::ModelLoader`].
    pub fn into_sources(self) -> Vec<MeshSource> {
        self.meshes
            .into_iter()
            .map(|desc| {
                let mesh = TriangleMesh::from_positions(desc.positions.into_iter().map(Vec3::from), desc.indices);
                MeshSource::new(desc.name, mesh, desc.instances)
            })
            .collect()
    }

    /// Demo scene: a `cells` x `cells` grid of unit quads on z = 0, placed
    /// twice (at the origin and one unit below).
    pub fn grid(cells: u32) -> Self {
        let side = cells + 1;
        let positions = (0..side)
            .flat_map(|y| (0..side).map(move |x| [x as f32, y as f32, 0.0]))
            .collect();
        let mut indices = Vec::with_capacity((cells * cells * 6) as usize);
        for y in 0..cells {
            for x in 0..cells {
                let i = y * side + x;
                indices.extend([i, i + 1, i + side + 1, i, i + side + 1, i + side]);
            }
        }
        Self {
            meshes: vec![MeshDesc {
                name: "grid".into(),
                positions,
                indices,
                instances: vec![Mat4::IDENTITY, Mat4::from_translation(Vec3::new(0.0, 0.0, -1.0))],
            }],
        }
    }
}
