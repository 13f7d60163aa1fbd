//! glTF 2.0 descriptor inspection.
//!
//! Only the parts needed before handing the files to the renderer are read:
//! the asset version, external file references, and the `POSITION` accessor
//! ranges that give the model's bounding box.

use bevy::prelude::*;
use gltf::{Gltf, Semantic};
use thiserror::Error;

use super::bounds::ModelBounds;

/// Container format of a model, derived from the URL extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// JSON descriptor with sibling buffer and image files.
    Gltf,
    /// Binary container with the descriptor embedded.
    Glb,
}

impl ModelFormat {
    /// Match a lower-case file extension. `Err` carries the unsupported extension.
    pub fn from_extension(extension: &str) -> Result<Self, String> {
        match extension.to_ascii_lowercase().as_str() {
            "gltf" => Ok(Self::Gltf),
            "glb" => Ok(Self::Glb),
            other => Err(other.to_string()),
        }
    }

    pub fn from_path(path: &str) -> Result<Self, String> {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        match file_name.rsplit_once('.') {
            Some((_, extension)) => Self::from_extension(extension),
            None => Err(String::new()),
        }
    }
}

/// Why a descriptor was rejected.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("descriptor is not valid glTF: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("binary container does not start with glTF magic")]
    NotBinary,

    #[error("glTF version {0} is not supported")]
    UnsupportedVersion(String),

    #[error("embedded binary chunk is shorter than declared")]
    ShortBinaryChunk,

    #[error("buffer {0} has no data source")]
    MissingBuffer(usize),

    #[error("node {0} is reached more than once in the scene graph")]
    SharedNode(usize),

    #[error("POSITION accessor {0} has no 3D min/max")]
    PositionRange(usize),

    #[error("model contains no positional data")]
    NoPositions,

    #[error("model bounds are not finite")]
    NonFiniteBounds,
}

/// A file the descriptor references by URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub uri: String,
    pub kind: DependencyKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Buffer { byte_length: usize },
    Image,
}

/// Result of inspecting a descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedModel {
    pub bounds: ModelBounds,
    pub dependencies: Vec<Dependency>,
}

/// Inspect a descriptor. Both containers go through the same reader; the
/// format only decides whether the binary header is mandatory.
pub fn parse_model(format: ModelFormat, bytes: &[u8]) -> Result<ParsedModel, DescriptorError> {
    if format == ModelFormat::Glb && !bytes.starts_with(b"glTF") {
        return Err(DescriptorError::NotBinary);
    }
    let gltf = Gltf::from_slice(bytes)?;

    let version = &gltf.as_json().asset.version;
    if !version.starts_with("2.") {
        return Err(DescriptorError::UnsupportedVersion(version.clone()));
    }

    let dependencies = dependencies(&gltf)?;
    let bounds = model_bounds(&gltf)?.ok_or(DescriptorError::NoPositions)?;
    if !bounds.is_finite() {
        return Err(DescriptorError::NonFiniteBounds);
    }

    Ok(ParsedModel {
        bounds,
        dependencies,
    })
}

fn dependencies(gltf: &Gltf) -> Result<Vec<Dependency>, DescriptorError> {
    let mut dependencies = Vec::new();
    let embedded_len = gltf.blob.as_ref().map(Vec::len);

    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Uri(uri) if is_data_uri(uri) => {}
            gltf::buffer::Source::Uri(uri) => dependencies.push(Dependency {
                uri: uri.to_string(),
                kind: DependencyKind::Buffer {
                    byte_length: buffer.length(),
                },
            }),
            gltf::buffer::Source::Bin => match embedded_len {
                Some(len) if len >= buffer.length() => {}
                Some(_) => return Err(DescriptorError::ShortBinaryChunk),
                None => return Err(DescriptorError::MissingBuffer(buffer.index())),
            },
        }
    }

    for image in gltf.images() {
        if let gltf::image::Source::Uri { uri, .. } = image.source() {
            if !is_data_uri(uri) {
                dependencies.push(Dependency {
                    uri: uri.to_string(),
                    kind: DependencyKind::Image,
                });
            }
        }
    }

    Ok(dependencies)
}

/// Union of all reachable primitive bounds in model space.
fn model_bounds(gltf: &Gltf) -> Result<Option<ModelBounds>, DescriptorError> {
    let node_count = gltf.nodes().len();
    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());

    let roots: Vec<gltf::Node> = match scene {
        Some(scene) => scene.nodes().collect(),
        None => {
            let mut is_child = vec![false; node_count];
            for child in gltf.nodes().flat_map(|node| node.children()) {
                is_child[child.index()] = true;
            }
            gltf.nodes().filter(|node| !is_child[node.index()]).collect()
        }
    };

    if roots.is_empty() {
        // No scene graph: fall back to raw mesh data.
        let mut acc = None;
        for mesh in gltf.meshes() {
            if let Some(bounds) = mesh_bounds(&mesh)? {
                acc = Some(merge(acc, bounds));
            }
        }
        return Ok(acc);
    }

    // Each node is visited once. glTF nodes form disjoint trees, so a second
    // visit means a cycle or a shared child.
    let mut visited = vec![false; node_count];
    let mut stack: Vec<(gltf::Node, Mat4)> =
        roots.into_iter().map(|node| (node, Mat4::IDENTITY)).collect();
    let mut acc = None;

    while let Some((node, parent)) = stack.pop() {
        if std::mem::replace(&mut visited[node.index()], true) {
            return Err(DescriptorError::SharedNode(node.index()));
        }
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

        if let Some(mesh) = node.mesh() {
            if let Some(bounds) = mesh_bounds(&mesh)? {
                acc = Some(merge(acc, bounds.transformed(&world)));
            }
        }
        stack.extend(node.children().map(|child| (child, world)));
    }
    Ok(acc)
}

fn mesh_bounds(mesh: &gltf::Mesh) -> Result<Option<ModelBounds>, DescriptorError> {
    let mut acc = None;
    for primitive in mesh.primitives() {
        let Some(positions) = primitive.get(&Semantic::Positions) else {
            continue;
        };
        let range = positions
            .min()
            .zip(positions.max())
            .and_then(|(min, max)| Some((vec3_from(&min)?, vec3_from(&max)?)));
        let Some((min, max)) = range else {
            return Err(DescriptorError::PositionRange(positions.index()));
        };
        acc = Some(merge(acc, ModelBounds::new(min, max)));
    }
    Ok(acc)
}

fn merge(acc: Option<ModelBounds>, bounds: ModelBounds) -> ModelBounds {
    acc.map_or(bounds, |a| a.union(&bounds))
}

fn vec3_from(value: &gltf::json::Value) -> Option<Vec3> {
    match value.as_array()?.as_slice() {
        [x, y, z] => Some(Vec3::new(
            x.as_f64()? as f32,
            y.as_f64()? as f32,
            z.as_f64()? as f32,
        )),
        _ => None,
    }
}

fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const GLB_MAGIC: u32 = 0x4654_6C67;
    const GLB_VERSION: u32 = 2;
    const GLB_HEADER_LEN: usize = 12;
    const CHUNK_JSON: u32 = 0x4E4F_534A;
    const CHUNK_BIN: u32 = 0x004E_4942;

    /// A single-triangle model with an external buffer and texture.
    pub(crate) const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [ { "nodes": [0] } ],
        "nodes": [ { "children": [1], "translation": [0.0, 1.0, 0.0] }, { "mesh": 0, "scale": [2.0, 2.0, 2.0] } ],
        "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 } } ] } ],
        "accessors": [ { "componentType": 5126, "count": 3, "type": "VEC3", "min": [-0.5, 0.0, -0.5], "max": [0.5, 1.0, 0.5] } ],
        "buffers": [ { "uri": "triangle.bin", "byteLength": 36 } ],
        "images": [ { "uri": "textures/albedo.png" }, { "uri": "data:image/png;base64,AAAA" } ]
    }"#;

    pub(crate) fn glb_from_json(json: &str, bin: Option<&[u8]>) -> Vec<u8> {
        let mut json_bytes = json.as_bytes().to_vec();
        while json_bytes.len() % 4 != 0 {
            json_bytes.push(b' ');
        }
        let mut body = Vec::new();
        body.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
        body.extend_from_slice(&CHUNK_JSON.to_le_bytes());
        body.extend_from_slice(&json_bytes);
        if let Some(bin) = bin {
            body.extend_from_slice(&(bin.len() as u32).to_le_bytes());
            body.extend_from_slice(&CHUNK_BIN.to_le_bytes());
            body.extend_from_slice(bin);
        }

        let mut glb = Vec::new();
        glb.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
        glb.extend_from_slice(&((GLB_HEADER_LEN + body.len()) as u32).to_le_bytes());
        glb.extend_from_slice(&body);
        glb
    }

    fn with_nodes(nodes: &str, scenes: &str) -> String {
        format!(
            r#"{{
            "asset": {{ "version": "2.0" }},
            {scenes}
            "nodes": {nodes},
            "meshes": [ {{ "primitives": [ {{ "attributes": {{ "POSITION": 0 }} }} ] }} ],
            "accessors": [ {{ "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 1.0] }} ]
        }}"#
        )
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ModelFormat::from_path("/models/duck.GLB"), Ok(ModelFormat::Glb));
        assert_eq!(ModelFormat::from_path("/models/duck.gltf"), Ok(ModelFormat::Gltf));
        assert_eq!(ModelFormat::from_path("/models/duck.usdz"), Err("usdz".to_string()));
        assert_eq!(ModelFormat::from_path("/models.v2/duck"), Err(String::new()));
    }

    #[test]
    fn gltf_bounds_follow_node_hierarchy() {
        let parsed = parse_model(ModelFormat::Gltf, TRIANGLE_GLTF.as_bytes()).unwrap();
        assert!(parsed.bounds.min.abs_diff_eq(Vec3::new(-1.0, 1.0, -1.0), 1e-5));
        assert!(parsed.bounds.max.abs_diff_eq(Vec3::new(1.0, 3.0, 1.0), 1e-5));
    }

    #[test]
    fn gltf_lists_external_files_only() {
        let parsed = parse_model(ModelFormat::Gltf, TRIANGLE_GLTF.as_bytes()).unwrap();
        assert_eq!(
            parsed.dependencies,
            vec![
                Dependency {
                    uri: "triangle.bin".to_string(),
                    kind: DependencyKind::Buffer { byte_length: 36 }
                },
                Dependency {
                    uri: "textures/albedo.png".to_string(),
                    kind: DependencyKind::Image
                },
            ]
        );
    }

    #[test]
    fn glb_uses_embedded_binary_chunk() {
        let json = r#"{
            "asset": { "version": "2.0" },
            "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 } } ] } ],
            "nodes": [ { "mesh": 0 } ],
            "accessors": [ { "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 2.0, 3.0] } ],
            "buffers": [ { "byteLength": 8 } ]
        }"#;
        let glb = glb_from_json(json, Some(&[0u8; 8]));
        let parsed = parse_model(ModelFormat::Glb, &glb).unwrap();
        assert!(parsed.dependencies.is_empty());
        assert_eq!(parsed.bounds.size(), Vec3::new(1.0, 2.0, 3.0));

        let oversized = json.replace("\"byteLength\": 8", "\"byteLength\": 16");
        let short = glb_from_json(&oversized, Some(&[0u8; 8]));
        assert!(matches!(
            parse_model(ModelFormat::Glb, &short),
            Err(DescriptorError::ShortBinaryChunk)
        ));
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        assert!(matches!(
            parse_model(ModelFormat::Glb, b"not a glb at all"),
            Err(DescriptorError::NotBinary)
        ));
        assert!(matches!(
            parse_model(ModelFormat::Gltf, b"{"),
            Err(DescriptorError::Gltf(_))
        ));

        let old = r#"{ "asset": { "version": "1.0" } }"#;
        assert!(matches!(
            parse_model(ModelFormat::Gltf, old.as_bytes()),
            Err(DescriptorError::UnsupportedVersion(version)) if version == "1.0"
        ));

        let empty = r#"{ "asset": { "version": "2.0" } }"#;
        assert!(matches!(
            parse_model(ModelFormat::Gltf, empty.as_bytes()),
            Err(DescriptorError::NoPositions)
        ));

        let cycle = with_nodes(
            r#"[ { "children": [1] }, { "children": [0], "mesh": 0 } ]"#,
            r#""scenes": [ { "nodes": [0] } ],"#,
        );
        assert!(parse_model(ModelFormat::Gltf, cycle.as_bytes()).is_err());
    }

    #[test]
    fn shared_children_are_walked_once_then_rejected() {
        // A wide diamond lattice would take 2^n walks if shared nodes were
        // followed along every path.
        let mut nodes = Vec::new();
        for level in 0..40 {
            let next = (level + 1) * 2;
            nodes.push(format!(r#"{{ "children": [{next}, {}] }}"#, next + 1));
            nodes.push(format!(r#"{{ "children": [{next}, {}] }}"#, next + 1));
        }
        nodes.push(r#"{ "mesh": 0 }"#.to_string());
        nodes.push(r#"{ "mesh": 0 }"#.to_string());
        let lattice = with_nodes(
            &format!("[ {} ]", nodes.join(", ")),
            r#""scenes": [ { "nodes": [0] } ],"#,
        );

        assert!(matches!(
            parse_model(ModelFormat::Gltf, lattice.as_bytes()),
            Err(DescriptorError::SharedNode(_))
        ));
    }

    #[test]
    fn scene_less_models_use_parentless_nodes() {
        let loose = with_nodes(
            r#"[ { "children": [1], "translation": [0.0, 0.0, 5.0] }, { "mesh": 0 } ]"#,
            "",
        );
        let parsed = parse_model(ModelFormat::Gltf, loose.as_bytes()).unwrap();
        assert!(parsed.bounds.min.abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-5));
    }

    #[test]
    fn truncated_glb_is_malformed() {
        let json = r#"{ "asset": { "version": "2.0" } }"#;
        let mut glb = glb_from_json(json, None);
        glb.truncate(glb.len() - 4);
        assert!(matches!(
            parse_model(ModelFormat::Glb, &glb),
            Err(DescriptorError::Gltf(_))
        ));
    }
}
