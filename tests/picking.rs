//! End-to-end picking: loader, instances and brute-force agreement.

use std::sync::Arc;

use meshpick::bvh::{BuildOptions, MeshBvh, MollerTrumbore, TriangleTester};
use meshpick::geom::{Model, TriangleMesh};
use meshpick::loader::{MeshSource, ModelLoader};
use meshpick::scene::SceneDesc;
use meshpick::util::{MalformedGeometry, Mat4, Quat, Ray, Vec2, Vec3};

struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 40) as f32 / (1u64 << 24) as f32
    }

    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }
}

/// Closed unit cube centred on the origin, 12 triangles.
fn cube() -> TriangleMesh {
    let p = |x: f32, y: f32, z: f32| Vec3::new(x, y, z) - Vec3::splat(0.5);
    let positions = [
        p(0.0, 0.0, 0.0),
        p(1.0, 0.0, 0.0),
        p(1.0, 1.0, 0.0),
        p(0.0, 1.0, 0.0),
        p(0.0, 0.0, 1.0),
        p(1.0, 0.0, 1.0),
        p(1.0, 1.0, 1.0),
        p(0.0, 1.0, 1.0),
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1, 0, 3, 2, // -z
        4, 5, 6, 4, 6, 7, // +z
        0, 1, 5, 0, 5, 4, // -y
        3, 7, 6, 3, 6, 2, // +y
        0, 4, 7, 0, 7, 3, // -x
        1, 2, 6, 1, 6, 5, // +x
    ];
    TriangleMesh::from_positions(positions, indices)
}

/// Bumpy height field, `n` x `n` quads.
fn terrain(n: u32) -> TriangleMesh {
    let side = n + 1;
    let positions = (0..side).flat_map(|y| {
        (0..side).map(move |x| {
            let (fx, fy) = (x as f32, y as f32);
            Vec3::new(fx, fy, (fx * 0.7).sin() * (fy * 0.4).cos())
        })
    });
    let mut indices = Vec::new();
    for y in 0..n {
        for x in 0..n {
            let i = y * side + x;
            indices.extend([i, i + 1, i + side + 1, i, i + side + 1, i + side]);
        }
    }
    TriangleMesh::from_positions(positions, indices)
}

/// Closest hit over every triangle of every instance, in model space.
fn brute_force(sources: &[(TriangleMesh, Vec<Mat4>)], ray: &Ray) -> f32 {
    let tester = MollerTrumbore::default();
    let mut best = f32::INFINITY;
    for (mesh, transforms) in sources {
        for m in transforms {
            for slot in 0..mesh.triangle_count() {
                let [a, b, c] = mesh.triangle(slot).expect("slot in range");
                let (a, b, c) = (m.transform_point3(a), m.transform_point3(b), m.transform_point3(c));
                if let Some(hit) = tester.test(a, b, c, ray) {
                    best = best.min(hit.t);
                }
            }
        }
    }
    best
}

#[test]
fn test_model_matches_brute_force() {
    let sources = vec![
        (
            terrain(12),
            vec![Mat4::IDENTITY, Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0))],
        ),
        (
            cube(),
            vec![
                Mat4::from_translation(Vec3::new(3.0, 4.0, 2.0)),
                Mat4::from_scale_rotation_translation(
                    Vec3::new(2.0, 1.0, 3.0),
                    Quat::from_rotation_z(0.6),
                    Vec3::new(8.0, 6.0, 1.0),
                ),
            ],
        ),
    ];
    let mesh_sources = sources
        .iter()
        .enumerate()
        .map(|(i, (mesh, transforms))| MeshSource::new(format!("m{i}"), mesh.clone(), transforms.clone()))
        .collect();
    let (model, report) = ModelLoader::new(BuildOptions::default().with_leaf_threshold(4)).load(mesh_sources);
    assert!(report.is_clean());

    let mut rng = Lcg(0x5eed);
    let mut hits = 0;
    for _ in 0..300 {
        let origin = Vec3::new(rng.range(-2.0, 14.0), rng.range(-2.0, 14.0), rng.range(4.0, 8.0));
        let target = Vec3::new(rng.range(0.0, 12.0), rng.range(0.0, 12.0), rng.range(-4.0, 2.0));
        let ray = Ray::new(origin, target - origin);

        let expected = brute_force(&sources, &ray);
        let actual = model.closest_hit(&ray);
        if expected.is_infinite() {
            assert!(actual.is_infinite(), "ray {ray:?}: expected miss, got {actual}");
        } else {
            hits += 1;
            let tolerance = 1e-3 * expected.max(1.0);
            assert!((expected - actual).abs() < tolerance, "ray {ray:?}: {expected} vs {actual}");
        }
    }
    assert!(hits > 100, "too few rays hit ({hits}) to mean anything");
}

#[test]
fn test_face_plane_rays_match_brute_force() {
    // Axis-parallel rays lying exactly on the cube's face planes (x, y or z = +-0.5).
    let sources = vec![(cube(), vec![Mat4::IDENTITY])];
    let (model, _) = ModelLoader::new(BuildOptions::default().with_leaf_threshold(1))
        .load(vec![MeshSource::new("cube", cube(), vec![Mat4::IDENTITY])]);

    let mut rays = Vec::new();
    for a in [-0.5f32, -0.2, 0.0, 0.3, 0.5] {
        for b in [-0.5f32, 0.5] {
            rays.push(Ray::new(Vec3::new(-2.0, b, a), Vec3::X));
            rays.push(Ray::new(Vec3::new(2.0, a, b), Vec3::NEG_X));
            rays.push(Ray::new(Vec3::new(b, -2.0, a), Vec3::Y));
            rays.push(Ray::new(Vec3::new(a, b, 2.0), Vec3::NEG_Z));
        }
    }
    // Slanted, but with one direction component exactly zero.
    for z in [-0.25f32, 0.0, 0.25] {
        for y in [-0.5f32, 0.5] {
            rays.push(Ray::new(Vec3::new(-2.0, y, z - 1.5), Vec3::new(1.0, 0.0, 1.0)));
        }
    }

    for ray in &rays {
        let expected = brute_force(&sources, ray);
        assert!(expected.is_finite(), "ray {ray:?} should graze the cube");
        let actual = model.closest_hit(ray);
        assert!((expected - actual).abs() < 1e-5, "ray {ray:?}: {expected} vs {actual}");
    }

    // Just outside a face plane: both miss.
    let outside = Ray::new(Vec3::new(-2.0, 0.5 + 1e-3, 0.0), Vec3::X);
    assert!(brute_force(&sources, &outside).is_infinite());
    assert!(model.closest_hit(&outside).is_infinite());
}

#[test]
fn test_translation_invariance() {
    let mesh = Arc::new(MeshBvh::build(terrain(6), &BuildOptions::default()).expect("Failed to build BVH"));
    let ray = Ray::new(Vec3::new(2.3, 3.1, 10.0), Vec3::NEG_Z);

    let mut base = Model::new();
    base.add_mesh("terrain", Arc::clone(&mesh), &[Mat4::IDENTITY]);
    let t0 = base.closest_hit(&ray);
    assert!(t0.is_finite());

    for d in [0.5f32, 2.0, 17.25] {
        let mut moved = Model::new();
        moved.add_mesh("terrain", Arc::clone(&mesh), &[Mat4::from_translation(Vec3::NEG_Z * d)]);
        let t = moved.closest_hit(&ray);
        assert!((t - (t0 + d)).abs() < 1e-4, "offset {d}: {t} vs {}", t0 + d);
    }
}

#[test]
fn test_singular_instance_never_poisons_result() {
    let sources = vec![MeshSource::new(
        "cube",
        cube(),
        vec![
            Mat4::from_scale(Vec3::new(1.0, 1.0, 0.0)),
            Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0)),
        ],
    )];
    let (model, report) = ModelLoader::default().load(sources);
    assert_eq!(report.skipped_instances, 1);

    let hit = model.pick(&Ray::new(Vec3::new(0.1, 0.2, 5.0), Vec3::NEG_Z)).expect("second instance is hit");
    assert_eq!(hit.instance, 1);
    assert!((hit.t - 9.5).abs() < 1e-5);
    assert!((hit.point.z - -4.5).abs() < 1e-5);
}

#[test]
fn test_loader_rejects_malformed_meshes() {
    let mut ragged = cube();
    ragged.indices.pop();
    let mut dangling = cube();
    dangling.indices[5] = 99;

    let (model, report) = ModelLoader::default().load(vec![
        MeshSource::new("ragged", ragged, vec![Mat4::IDENTITY]),
        MeshSource::new("dangling", dangling, vec![Mat4::IDENTITY]),
        MeshSource::new("cube", cube(), vec![Mat4::IDENTITY]),
    ]);

    assert_eq!(model.meshes().len(), 1);
    assert_eq!(model.meshes()[0].name(), "cube");
    let reasons: Vec<_> = report.rejected.iter().map(|(name, err)| (name.as_str(), err.clone())).collect();
    assert_eq!(
        reasons,
        vec![
            ("ragged", MalformedGeometry::IndexCountNotMultipleOfThree { len: 35 }),
            (
                "dangling",
                MalformedGeometry::IndexOutOfRange {
                    position: 5,
                    index: 99,
                    vertex_count: 8
                }
            ),
        ]
    );
}

#[test]
fn test_pick_from_screen() {
    let (model, _) = ModelLoader::default().load(SceneDesc::grid(10).into_sources());

    let eye = Vec3::new(5.0, 5.0, 20.0);
    let view = Mat4::look_at_rh(eye, Vec3::new(5.0, 5.0, 0.0), Vec3::Y);
    let projection = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
    let inverse = (projection * view).inverse();

    let ray = Ray::from_screen(Vec2::ZERO, &inverse).expect("finite camera");
    let hit = model.pick(&ray).expect("centre of screen hits the grid");
    assert_eq!(hit.instance, 0);
    assert!((hit.point - Vec3::new(5.0, 5.0, 0.0)).length() < 1e-3);
    assert!((hit.t - 19.9).abs() < 1e-2, "ray starts on the near plane, got {}", hit.t);
}
