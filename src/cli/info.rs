use crate::chunk::Tag;
use crate::cursor::Cursor;
use crate::error::Result;
use crate::params::ExtractionParameters;
use crate::payload::{split_volume, PayloadKind, VolumeHeader};
use crate::scope::{enter_container_chunk_clamped, ChunkScope};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Options for the info command
#[derive(Debug, Clone)]
pub struct InfoOptions {
    /// Emit the chunk tree as JSON instead of text
    pub json: bool,
    /// Rows of 16 payload bytes to preview per leaf chunk
    pub rows: usize,
    /// Include a BLAKE3 digest of every leaf payload
    pub checksum: bool,
}

impl Default for InfoOptions {
    fn default() -> Self {
        Self {
            json: false,
            rows: 2,
            checksum: false,
        }
    }
}

const ROW_BYTES: usize = 16;

/// One chunk in the tree report
#[derive(Debug, Clone, Serialize)]
pub struct ChunkNode {
    pub tag: String,
    pub offset: usize,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<ExtractionParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<VolumeHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub preview: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChunkNode>,
    /// Problem that stopped the walk of this chunk's children
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChunkNode {
    /// Number of chunks nested anywhere below this one
    pub fn descendants(&self) -> usize {
        self.children.iter().map(|c| 1 + c.descendants()).sum()
    }

    /// Errors that stopped the walk of a container here or further down
    pub fn walk_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        self.collect_walk_errors(&mut errors);
        errors
    }

    fn collect_walk_errors(&self, errors: &mut Vec<String>) {
        if self.form.is_some() {
            errors.extend(self.error.iter().cloned());
        }
        for child in &self.children {
            child.collect_walk_errors(errors);
        }
    }
}

fn tag_label(tag: Tag) -> String {
    tag.to_string().trim_matches('"').to_string()
}

/// Build the chunk tree of a buffer.
///
/// Fails only when the outer chunk cannot be entered. Damage further down
/// is recorded on the node where the walk stopped.
pub fn chunk_tree(data: &[u8], options: &InfoOptions) -> Result<ChunkNode> {
    let mut root = Cursor::new(data);
    let (scope, _) = enter_container_chunk_clamped(&mut root)?;
    Ok(container_node(scope, options))
}

fn container_node(scope: ChunkScope<'_>, options: &InfoOptions) -> ChunkNode {
    let mut node = base_node(&scope);
    let mut walker = scope.walker();
    let mut first = true;
    loop {
        match walker.next_entry() {
            Ok(Some((child, _))) => {
                let leading = first && scope.form() == Some(Tag::ZERO);
                node.children.push(if child.form().is_some() {
                    container_node(child, options)
                } else {
                    leaf_node(child, leading, options)
                });
                first = false;
            }
            Ok(None) => break,
            Err(e) => {
                node.error = Some(e.to_string());
                break;
            }
        }
    }
    node
}

fn base_node(scope: &ChunkScope<'_>) -> ChunkNode {
    ChunkNode {
        tag: tag_label(scope.tag()),
        offset: scope.offset(),
        size: scope.declared_length(),
        form: scope.form().map(tag_label),
        params: None,
        volume: None,
        checksum: None,
        preview: Vec::new(),
        truncated: scope.is_truncated(),
        children: Vec::new(),
        error: None,
    }
}

fn leaf_node(mut scope: ChunkScope<'_>, leading: bool, options: &InfoOptions) -> ChunkNode {
    let mut node = base_node(&scope);
    let mut samples = scope.payload();

    if leading && scope.tag() == Tag::SPLI {
        match ExtractionParameters::decode(scope.cursor_mut()) {
            Ok(params) => node.params = Some(params),
            Err(e) => node.error = Some(e.to_string()),
        }
        samples = &[];
    } else if PayloadKind::from_tag(scope.tag()).is_volume() {
        match split_volume(samples) {
            Ok((header, rest)) => {
                node.volume = Some(header);
                samples = rest;
            }
            Err(e) => node.error = Some(e.to_string()),
        }
    }

    if options.checksum {
        node.checksum = Some(blake3::hash(scope.payload()).to_hex().to_string());
    }
    node.preview = samples
        .chunks(ROW_BYTES)
        .take(options.rows)
        .map(hex_row)
        .collect();
    if samples.len() > options.rows * ROW_BYTES && options.rows > 0 {
        node.preview.push("...".into());
    }
    node
}

fn hex_row(row: &[u8]) -> String {
    row.iter()
        .map(|b| hex::encode([*b]))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a chunk tree in the zerotool text layout
pub fn render_tree(node: &ChunkNode) -> String {
    let mut output = String::new();
    render_node(node, 0, &mut output);
    output
}

fn render_node(node: &ChunkNode, depth: usize, output: &mut String) {
    let pad = "    ".repeat(depth);
    let inner = "    ".repeat(depth + 1);

    output.push_str(&format!("{}chunk ID : \"{}\"\n", pad, node.tag));
    output.push_str(&format!("{}size : {}\n", pad, node.size));
    if let Some(form) = &node.form {
        output.push_str(&format!("{}type : \"{}\"\n", pad, form));
    }
    if node.truncated {
        output.push_str(&format!("{}(truncated)\n", pad));
    }

    if let Some(params) = &node.params {
        output.push_str(&format!("{}file_version : {}\n", inner, params.format_version));
        output.push_str(&format!("{}width : {}\n", inner, params.width));
        output.push_str(&format!("{}height : {}\n", inner, params.height));
        output.push_str(&format!("{}hpitch : {}\n", inner, params.h_pitch));
    }
    if let Some(volume) = &node.volume {
        output.push_str(&format!("{}lambda : {:04x}\n", inner, volume.lambda));
        output.push_str(&format!("{}gain : {}\n", inner, volume.gain));
    }
    if let Some(checksum) = &node.checksum {
        output.push_str(&format!("{}blake3 : {}\n", inner, checksum));
    }
    for row in &node.preview {
        output.push_str(&format!("{}{}\n", inner, row));
    }

    for child in &node.children {
        render_node(child, depth + 1, output);
    }
    if let Some(error) = &node.error {
        output.push_str(&format!("{}error : {}\n", inner, error));
    }
}

/// Display the chunk tree of a file
pub fn show_info(path: &Path, options: &InfoOptions) -> Result<String> {
    let data = fs::read(path)?;
    show_info_bytes(&data, options)
}

/// Display the chunk tree of an in-memory buffer
pub fn show_info_bytes(data: &[u8], options: &InfoOptions) -> Result<String> {
    let tree = chunk_tree(data, options)?;
    if options.json {
        let mut json = serde_json::to_string_pretty(&tree)?;
        json.push('\n');
        return Ok(json);
    }
    Ok(render_tree(&tree))
}
