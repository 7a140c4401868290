use std::collections::HashMap;
use std::fmt::Write as FmtWrite;

use glam::Mat4;

use crate::gltf::MeshInstance;

/// World transforms of mesh instances, in walk order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformTable {
    pub transforms: Vec<Mat4>,
}

/// Bit patterns of the 16 column-major floats, so `-0.0 != 0.0` and NaNs compare.
fn key(transform: &Mat4) -> [u32; 16] {
    bytemuck::cast(transform.to_cols_array())
}

impl TransformTable {
    /// With `dedup`, bit-identical transforms are kept once at their first position.
    pub fn collect(instances: &[MeshInstance], dedup: bool) -> TransformTable {
        let mut transforms = Vec::with_capacity(instances.len());
        let mut seen: HashMap<[u32; 16], usize> = HashMap::new();
        for instance in instances {
            if dedup {
                let next = transforms.len();
                if *seen.entry(key(&instance.transform)).or_insert(next) != next {
                    continue;
                }
            }
            transforms.push(instance.transform);
        }
        TransformTable { transforms }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Renders the table as a `mat4_t` array literal, one row per line,
    /// each number right-aligned to `width` columns.
    pub fn to_c_array(&self, width: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "    mat4_t transforms[{}] = {{", self.transforms.len());
        for transform in &self.transforms {
            out.push_str("        {{\n");
            for i in 0..4 {
                let row = transform.row(i);
                let _ = writeln!(
                    out,
                    "            {{{:w$.6}f, {:w$.6}f, {:w$.6}f, {:w$.6}f}},",
                    row.x,
                    row.y,
                    row.z,
                    row.w,
                    w = width
                );
            }
            out.push_str("        }},\n");
        }
        out.push_str("    };\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn instance(node: usize, transform: Mat4) -> MeshInstance {
        MeshInstance {
            node,
            mesh: node,
            transform,
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let a = Mat4::from_translation(Vec3::X);
        let b = Mat4::from_scale(Vec3::splat(2.0));
        let instances = [
            instance(0, a),
            instance(1, b),
            instance(2, a),
            instance(3, Mat4::IDENTITY),
            instance(4, b),
        ];
        let table = TransformTable::collect(&instances, true);
        assert_eq!(table.transforms, vec![a, b, Mat4::IDENTITY]);

        let all = TransformTable::collect(&instances, false);
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn signed_zero_is_a_different_transform() {
        let mut negative = Mat4::IDENTITY;
        negative.w_axis.x = -0.0;
        let table =
            TransformTable::collect(&[instance(0, Mat4::IDENTITY), instance(1, negative)], true);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn c_array_is_row_major() {
        let table = TransformTable {
            transforms: vec![Mat4::from_translation(Vec3::new(1.5, -2.0, 3.0))],
        };
        let expected = "    mat4_t transforms[1] = {\n\
                        \x20       {{\n\
                        \x20           {  1.000000f,   0.000000f,   0.000000f,   1.500000f},\n\
                        \x20           {  0.000000f,   1.000000f,   0.000000f,  -2.000000f},\n\
                        \x20           {  0.000000f,   0.000000f,   1.000000f,   3.000000f},\n\
                        \x20           {  0.000000f,   0.000000f,   0.000000f,   1.000000f},\n\
                        \x20       }},\n\
                        \x20   };\n";
        assert_eq!(table.to_c_array(10), expected);
    }

    #[test]
    fn empty_table() {
        let table = TransformTable::collect(&[], true);
        assert!(table.is_empty());
        assert_eq!(table.to_c_array(10), "    mat4_t transforms[0] = {\n    };\n");
    }
}
