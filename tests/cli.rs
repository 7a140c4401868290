//! End-to-end tests for the gltf-bake binary
//!
//! Writes a small two-mesh scene into a temp dir, runs the CLI, checks the files.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

/// Two meshes sharing one position buffer; mesh 0 also has normals and
/// texcoords. Nodes 1 and 2 both end up with a translation of (1, 0, 0).
const SCENE: &str = r#"{
    "scene": 0,
    "scenes": [{ "nodes": [0, 2] }],
    "nodes": [
        { "children": [1], "translation": [1, 0, 0] },
        { "mesh": 0 },
        { "mesh": 1, "matrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 1,0,0,1] }
    ],
    "meshes": [
        { "primitives": [{ "attributes": { "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2 }, "indices": 3 }] },
        { "primitives": [{ "attributes": { "POSITION": 0 } }] }
    ],
    "buffers": [{ "uri": "scene.bin", "byteLength": 102 }],
    "bufferViews": [
        { "byteOffset": 0, "byteLength": 36 },
        { "byteOffset": 36, "byteLength": 36 },
        { "byteOffset": 72, "byteLength": 24 },
        { "byteOffset": 96, "byteLength": 6 }
    ],
    "accessors": [
        { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" },
        { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3" },
        { "bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2" },
        { "bufferView": 3, "componentType": 5123, "count": 3, "type": "SCALAR" }
    ]
}"#;

fn write_scene(dir: &Path) {
    let floats: [f32; 24] = [
        0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, // positions
        0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, // normals
        0.0, 0.0, 1.0, 0.0, 0.0, 1.0, // texcoords
    ];
    let mut blob: Vec<u8> = floats.iter().flat_map(|v| v.to_le_bytes()).collect();
    for index in [0u16, 1, 2] {
        blob.extend_from_slice(&index.to_le_bytes());
    }
    assert_eq!(blob.len(), 102);
    std::fs::write(dir.join("scene.gltf"), SCENE).expect("Failed to write glTF");
    std::fs::write(dir.join("scene.bin"), blob).expect("Failed to write binary");
}

fn gltf_bake(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gltf-bake"))
        .args(args)
        .output()
        .expect("Failed to run gltf-bake")
}

#[test]
fn test_obj_command_writes_every_mesh() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_scene(dir.path());
    let out = dir.path().join("out");

    let output = gltf_bake(&[
        "obj",
        dir.path().join("scene.gltf").to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--name",
        "part{}.obj",
    ]);
    assert!(output.status.success(), "obj command failed: {output:?}");

    let first = std::fs::read_to_string(out.join("part0.obj")).expect("part0.obj missing");
    assert!(first.starts_with("v 0.000000 0.000000 0.000000\n"));
    assert!(first.contains("\nvt 1.000000 0.000000\n"));
    assert!(first.contains("\nvn 0.000000 0.000000 1.000000\n"));
    assert!(first.ends_with("f 1/1/1 2/2/2 3/3/3\n"));

    let second = std::fs::read_to_string(out.join("part1.obj")).expect("part1.obj missing");
    assert_eq!(second.lines().count(), 4);
    assert!(second.ends_with("f 1 2 3\n"));
}

#[test]
fn test_transforms_command_dedups() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_scene(dir.path());
    let gltf = dir.path().join("scene.gltf");

    let all = gltf_bake(&["transforms", gltf.to_str().unwrap(), "--no-dedup"]);
    assert!(all.status.success(), "transforms command failed: {all:?}");
    let all = String::from_utf8(all.stdout).unwrap();
    assert!(all.starts_with("    mat4_t transforms[2] = {\n"));

    let deduped = gltf_bake(&["transforms", gltf.to_str().unwrap()]);
    assert!(deduped.status.success(), "transforms command failed: {deduped:?}");
    let deduped = String::from_utf8(deduped.stdout).unwrap();
    assert!(deduped.starts_with("    mat4_t transforms[1] = {\n"));
    assert!(deduped.contains("{  1.000000f,   0.000000f,   0.000000f,   1.000000f},"));
}

#[test]
fn test_build_manifest() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_scene(dir.path());
    std::fs::write(
        dir.path().join("bake.toml"),
        r#"
document = "scene.gltf"
output = "assets"

[meshes]
names = ["triangle.obj"]

[transforms]
output = "transforms.inc"
"#,
    )
    .unwrap();

    let output = gltf_bake(&["build", dir.path().join("bake.toml").to_str().unwrap()]);
    assert!(output.status.success(), "build failed: {output:?}");

    let assets = dir.path().join("assets");
    assert!(assets.join("triangle.obj").exists());
    assert!(!assets.join("mesh1.obj").exists());
    let transforms = std::fs::read_to_string(assets.join("transforms.inc")).unwrap();
    assert!(transforms.contains("transforms[1]"));
}

#[test]
fn test_broken_binary_fails() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_scene(dir.path());
    std::fs::write(dir.path().join("scene.bin"), [0u8; 10]).unwrap();

    let output = gltf_bake(&["obj", dir.path().join("scene.gltf").to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("buffer 0"), "unexpected error: {stderr}");
}
