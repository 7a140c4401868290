use glam::Mat4;

use crate::error::{malformed, Error, Result};
use crate::gltf::Document;

/// A node that references a mesh, with its composed world transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshInstance {
    pub node: usize,
    pub mesh: usize,
    pub transform: Mat4,
}

/// Walks the default scene, or scene 0 if none is named. Documents with no
/// scenes at all are walked from every node that has no parent.
pub fn walk(document: &Document) -> Result<Vec<MeshInstance>> {
    let scene = document
        .scene
        .or_else(|| (!document.scenes.is_empty()).then_some(0));
    match scene {
        Some(scene) => walk_scene(document, scene),
        None => walk_roots(document, &parentless_nodes(document)?),
    }
}

pub fn walk_scene(document: &Document, scene: usize) -> Result<Vec<MeshInstance>> {
    let scene = document
        .scenes
        .get(scene)
        .ok_or_else(|| malformed(format!("scene {scene} does not exist")))?;
    walk_roots(document, &scene.node_indices)
}

/// Depth-first, children in document order. Each instance's transform is
/// `parent world × local`. Every node is visited at most once: a node reached
/// from its own subtree is a `CyclicGraph`, and a node reached through a
/// second parent or listed twice as a root is `Malformed`.
pub fn walk_roots(document: &Document, roots: &[usize]) -> Result<Vec<MeshInstance>> {
    let mut instances = Vec::new();
    let mut seen = vec![false; document.nodes.len()];
    for &root in roots {
        walk_from(document, root, &mut seen, &mut instances)?;
    }
    Ok(instances)
}

fn walk_from(
    document: &Document,
    root: usize,
    seen: &mut [bool],
    instances: &mut Vec<MeshInstance>,
) -> Result<()> {
    document.node(root)?;
    if std::mem::replace(&mut seen[root], true) {
        return Err(more_than_one_parent(root));
    }
    // (node, parent world transform, depth)
    let mut node_stack = vec![(root, Mat4::IDENTITY, 0)];
    // The chain of nodes from the root down to the one being visited.
    let mut path: Vec<usize> = Vec::new();
    while let Some((node_index, parent_transform, depth)) = node_stack.pop() {
        path.truncate(depth);
        path.push(node_index);
        let node = document.node(node_index)?;
        let transform = parent_transform * node.transform.matrix();
        if let Some(mesh) = node.mesh_index {
            instances.push(MeshInstance {
                node: node_index,
                mesh,
                transform,
            });
        }
        for &child in node.child_node_indices.iter().rev() {
            if path.contains(&child) {
                return Err(Error::CyclicGraph { node: child });
            }
            let slot = seen
                .get_mut(child)
                .ok_or_else(|| malformed(format!("node {node_index} has missing child {child}")))?;
            if std::mem::replace(slot, true) {
                return Err(more_than_one_parent(child));
            }
            node_stack.push((child, transform, depth + 1));
        }
    }
    Ok(())
}

fn more_than_one_parent(node: usize) -> Error {
    malformed(format!("node {node} is reachable through more than one parent"))
}

/// Nodes that are nobody's child, in document order.
fn parentless_nodes(document: &Document) -> Result<Vec<usize>> {
    let mut parent = vec![None; document.nodes.len()];
    for (i, node) in document.nodes.iter().enumerate() {
        for &child in &node.child_node_indices {
            let slot = parent
                .get_mut(child)
                .ok_or_else(|| malformed(format!("node {i} has missing child {child}")))?;
            slot.get_or_insert(i);
        }
    }
    let roots: Vec<usize> = (0..parent.len()).filter(|&i| parent[i].is_none()).collect();
    if roots.is_empty() && !parent.is_empty() {
        // Every node has a parent, so climbing from any node must loop.
        let mut seen = vec![false; parent.len()];
        let mut node = 0;
        while !seen[node] {
            seen[node] = true;
            match parent[node] {
                Some(next) => node = next,
                None => break,
            }
        }
        return Err(Error::CyclicGraph { node });
    }
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gltf::{LocalTransform, Node, Scene};
    use glam::{Quat, Vec3};

    fn node(mesh_index: Option<usize>, children: &[usize], transform: Mat4) -> Node {
        Node {
            mesh_index,
            child_node_indices: children.to_vec(),
            transform: LocalTransform::Matrix(transform),
        }
    }

    fn document(nodes: Vec<Node>, roots: &[usize]) -> Document {
        Document {
            scene: Some(0),
            scenes: vec![Scene {
                node_indices: roots.to_vec(),
            }],
            nodes,
            meshes: Vec::new(),
            accessors: Vec::new(),
            buffer_views: Vec::new(),
            blob: Vec::new(),
        }
    }

    fn a() -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::new(1.0, 2.0, 0.5),
            Quat::from_rotation_y(0.7),
            Vec3::new(3.0, -1.0, 2.0),
        )
    }

    fn b() -> Mat4 {
        Mat4::from_rotation_x(1.3) * Mat4::from_translation(Vec3::new(0.0, 4.0, -2.0))
    }

    #[test]
    fn identity_root_keeps_child_transform() {
        let document = document(
            vec![node(None, &[1], Mat4::IDENTITY), node(Some(0), &[], a())],
            &[0],
        );
        let instances = walk(&document).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].transform, a());
        assert_eq!(instances[0].node, 1);
    }

    #[test]
    fn chain_composes_parent_then_child() {
        let document = document(
            vec![
                node(None, &[1], a()),
                node(None, &[2], b()),
                node(Some(7), &[], Mat4::IDENTITY),
            ],
            &[0],
        );
        let instances = walk(&document).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].mesh, 7);
        assert_eq!(instances[0].transform, a() * b());
        assert_ne!(instances[0].transform, b() * a());
    }

    #[test]
    fn visits_depth_first_in_document_order() {
        //      0
        //    /   \
        //   1     4
        //  / \
        // 2   3
        let nodes = vec![
            node(Some(0), &[1, 4], Mat4::IDENTITY),
            node(None, &[2, 3], Mat4::IDENTITY),
            node(Some(2), &[], Mat4::IDENTITY),
            node(Some(3), &[], Mat4::IDENTITY),
            node(Some(4), &[], Mat4::IDENTITY),
        ];
        let instances = walk(&document(nodes, &[0])).unwrap();
        let order: Vec<usize> = instances.iter().map(|instance| instance.node).collect();
        assert_eq!(order, vec![0, 2, 3, 4]);
    }

    #[test]
    fn walks_every_root() {
        let nodes = vec![node(Some(0), &[], a()), node(Some(1), &[], b())];
        let instances = walk(&document(nodes, &[1, 0])).unwrap();
        assert_eq!(instances[0].transform, b());
        assert_eq!(instances[1].transform, a());
    }

    #[test]
    fn shared_child_is_rejected() {
        let nodes = vec![
            node(None, &[2], a()),
            node(None, &[2], b()),
            node(Some(0), &[], Mat4::IDENTITY),
        ];
        assert!(matches!(
            walk(&document(nodes, &[0, 1])),
            Err(Error::Malformed(message)) if message.contains("node 2")
        ));
    }

    #[test]
    fn repeated_root_is_rejected() {
        let nodes = vec![node(Some(0), &[], a())];
        assert!(matches!(
            walk(&document(nodes, &[0, 0])),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn doubled_children_fail_without_expanding() {
        // Every node lists its successor twice; walking each path would
        // produce 2^63 instances.
        let count = 64;
        let nodes = (0..count)
            .map(|i| {
                let children = if i + 1 < count { vec![i + 1, i + 1] } else { Vec::new() };
                node(Some(0), &children, Mat4::IDENTITY)
            })
            .collect();
        assert!(matches!(
            walk(&document(nodes, &[0])),
            Err(Error::Malformed(message)) if message.contains("node 1")
        ));
    }

    #[test]
    fn self_reference_is_cyclic() {
        let document = document(vec![node(Some(0), &[0], Mat4::IDENTITY)], &[0]);
        assert_eq!(walk(&document), Err(Error::CyclicGraph { node: 0 }));
    }

    #[test]
    fn transitive_cycle_is_detected() {
        let nodes = vec![
            node(None, &[1], Mat4::IDENTITY),
            node(None, &[2], Mat4::IDENTITY),
            node(None, &[1], Mat4::IDENTITY),
        ];
        assert_eq!(
            walk(&document(nodes, &[0])),
            Err(Error::CyclicGraph { node: 1 })
        );
    }

    #[test]
    fn sceneless_document_starts_at_parentless_nodes() {
        let mut document = document(
            vec![
                node(None, &[], Mat4::IDENTITY),
                node(Some(1), &[], b()),
                node(None, &[1], a()),
            ],
            &[],
        );
        document.scene = None;
        document.scenes.clear();
        let instances = walk(&document).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].transform, a() * b());
    }

    #[test]
    fn sceneless_cycle_without_roots() {
        let mut document = document(
            vec![
                node(None, &[1], Mat4::IDENTITY),
                node(None, &[0], Mat4::IDENTITY),
            ],
            &[],
        );
        document.scene = None;
        document.scenes.clear();
        assert!(matches!(walk(&document), Err(Error::CyclicGraph { .. })));
    }
}
