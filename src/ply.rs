//! ASCII PLY reading and writing.
//!
//! The header is read sequentially; once `end_header` is reached every body
//! line is self-contained, so the vertex block and the face block are parsed
//! in parallel with rayon.
//!
//! Supported input:
//!
//! ```text
//! ply
//! format ascii 1.0
//! comment anything
//! element vertex 3
//! property float x
//! property float y
//! property float z
//! property uchar red        <- any subset of red/green/blue/alpha, any order
//! element face 1
//! property list uchar int vertex_indices
//! end_header
//! 0 0 0 255
//! 1 0 0 0
//! 0 1 0 128
//! 3 0 1 2
//! ```
//!
//! Color channels that are not declared default to 128 (alpha to 255). A file
//! with no color properties at all gets [`Color::UNCOLORED`] everywhere and
//! reports [`TriangleMesh::has_color`] as false. Faces that are not triangles
//! are skipped.
//!
//! Saving writes the transformed positions and the triangle indices only.
//! Colors are not written, so a save/load round trip keeps geometry and
//! topology but loses color.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use glam::DVec3;
use rayon::prelude::*;

use crate::color::Color;
use crate::error::{PlyError, PlyResult};
use crate::ids::IdGenerator;
use crate::mesh::TriangleMesh;

/// How one whitespace-separated column of a vertex line is used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Column {
    Position(usize),
    Color { channel: usize, normalized: bool },
    Ignored,
}

#[derive(Debug)]
struct Header {
    vertex_count: usize,
    face_count: usize,
    columns: Vec<Column>,
    has_color: bool,
    /// Number of lines up to and including `end_header`.
    len: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Vertex,
    Face,
}

fn malformed(line: usize, reason: impl Into<String>) -> PlyError {
    PlyError::MalformedHeader {
        line,
        reason: reason.into(),
    }
}

fn parse_header(lines: &[&str]) -> PlyResult<Header> {
    match lines.first().map(|l| l.trim()) {
        Some("ply") => {}
        _ => return Err(malformed(1, "missing `ply` magic")),
    }

    let mut format_seen = false;
    let mut vertex_count = None;
    let mut face_count = None;
    let mut face_list = false;
    let mut columns = Vec::new();
    let mut section = Section::None;

    for (i, raw) in lines.iter().enumerate().skip(1) {
        let line = i + 1;
        let tokens: Vec<&str> = raw.split_whitespace().collect();

        match tokens.as_slice() {
            [] => {}
            ["comment", ..] | ["obj_info", ..] => {}
            ["format", kind, version] => {
                if *kind != "ascii" || *version != "1.0" {
                    return Err(PlyError::UnsupportedFormat(format!("{kind} {version}")));
                }
                format_seen = true;
            }
            ["format", ..] => return Err(malformed(line, "format line needs a kind and a version")),
            ["element", name, count] => {
                let count: usize = count
                    .parse()
                    .map_err(|_| malformed(line, format!("bad element count {count:?}")))?;
                match *name {
                    "vertex" if vertex_count.is_some() => {
                        return Err(malformed(line, "vertex element declared twice"));
                    }
                    "vertex" => {
                        vertex_count = Some(count);
                        section = Section::Vertex;
                    }
                    "face" if vertex_count.is_none() => {
                        return Err(malformed(line, "face element declared before vertex element"));
                    }
                    "face" if face_count.is_some() => {
                        return Err(malformed(line, "face element declared twice"));
                    }
                    "face" => {
                        face_count = Some(count);
                        section = Section::Face;
                    }
                    other => return Err(PlyError::UnsupportedFormat(format!("element {other}"))),
                }
            }
            ["element", ..] => return Err(malformed(line, "element line needs a name and a count")),
            ["property", rest @ ..] => match section {
                Section::None => {
                    return Err(malformed(line, "property declared outside an element"));
                }
                Section::Vertex => match rest {
                    [kind, name] => columns.push(vertex_column(kind, name)),
                    _ => return Err(malformed(line, "vertex properties must be scalar")),
                },
                Section::Face => match rest {
                    ["list", _, _, _] if !face_list => face_list = true,
                    _ => {
                        return Err(malformed(
                            line,
                            "face element must declare exactly one list property",
                        ));
                    }
                },
            },
            ["end_header"] => {
                if !format_seen {
                    return Err(malformed(line, "missing format line"));
                }
                let vertex_count =
                    vertex_count.ok_or_else(|| malformed(line, "missing vertex element"))?;
                let face_count =
                    face_count.ok_or_else(|| malformed(line, "missing face element"))?;
                if face_count > 0 && !face_list {
                    return Err(malformed(line, "face element has no index list"));
                }
                for (axis, name) in ["x", "y", "z"].iter().enumerate() {
                    if !columns.contains(&Column::Position(axis)) {
                        return Err(malformed(line, format!("vertex property {name} is missing")));
                    }
                }
                let has_color = columns.iter().any(|c| matches!(c, Column::Color { .. }));

                return Ok(Header {
                    vertex_count,
                    face_count,
                    columns,
                    has_color,
                    len: line,
                });
            }
            [keyword, ..] => return Err(malformed(line, format!("unexpected keyword {keyword:?}"))),
        }
    }

    Err(malformed(lines.len() + 1, "missing end_header"))
}

fn vertex_column(kind: &str, name: &str) -> Column {
    let normalized = matches!(kind, "float" | "float32" | "double" | "float64");
    match name {
        "x" => Column::Position(0),
        "y" => Column::Position(1),
        "z" => Column::Position(2),
        "red" => Column::Color { channel: 0, normalized },
        "green" => Column::Color { channel: 1, normalized },
        "blue" => Column::Color { channel: 2, normalized },
        "alpha" => Column::Color { channel: 3, normalized },
        _ => Column::Ignored,
    }
}

fn number<T: std::str::FromStr>(line: usize, token: &str) -> PlyResult<T> {
    token.parse().map_err(|_| PlyError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

fn parse_vertex(header: &Header, line: usize, text: &str) -> PlyResult<(DVec3, Color)> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < header.columns.len() {
        return Err(PlyError::InvalidVertex {
            line,
            reason: format!(
                "expected {} values, found {}",
                header.columns.len(),
                tokens.len()
            ),
        });
    }

    let mut position = DVec3::ZERO;
    let mut rgba = [
        Color::DEFAULT_CHANNEL.r,
        Color::DEFAULT_CHANNEL.g,
        Color::DEFAULT_CHANNEL.b,
        Color::DEFAULT_CHANNEL.a,
    ];

    for (column, token) in header.columns.iter().zip(&tokens) {
        match *column {
            Column::Position(axis) => position[axis] = number(line, token)?,
            Column::Color { channel, normalized } => {
                let value: f64 = number(line, token)?;
                let value = if normalized { value * 255.0 } else { value };
                rgba[channel] = value.round().clamp(0.0, 255.0) as u8;
            }
            Column::Ignored => {}
        }
    }

    let color = if header.has_color {
        Color::rgba(rgba[0], rgba[1], rgba[2], rgba[3])
    } else {
        Color::UNCOLORED
    };
    Ok((position, color))
}

fn parse_face(line: usize, text: &str) -> PlyResult<Option<[u32; 3]>> {
    let mut tokens = text.split_whitespace();
    let count: usize = match tokens.next() {
        Some(token) => number(line, token)?,
        None => return Err(PlyError::InvalidFace { line, reason: "empty face".into() }),
    };
    if count != 3 {
        return Ok(None);
    }

    let mut face = [0u32; 3];
    for (slot, found) in face.iter_mut().zip(0..) {
        let token = tokens.next().ok_or_else(|| PlyError::InvalidFace {
            line,
            reason: format!("expected 3 indices, found {found}"),
        })?;
        *slot = number(line, token)?;
    }
    Ok(Some(face))
}

/// Parses PLY text into a new mesh.
///
/// # Errors
///
/// Fails on a malformed header, a body with fewer lines than declared, an
/// unparsable number, or a face index with no matching vertex. No partial
/// mesh is ever returned.
///
/// # Example
///
/// ```
/// use meshpick::{IdGenerator, ply};
///
/// let text = "ply\nformat ascii 1.0\nelement vertex 3\n\
///             property float x\nproperty float y\nproperty float z\n\
///             element face 1\nproperty list uchar int vertex_indices\nend_header\n\
///             0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n";
///
/// let ids = IdGenerator::new();
/// let mesh = ply::parse_str(text, &ids).unwrap();
/// assert_eq!(mesh.vertex_count(), 3);
/// assert_eq!(mesh.triangle_count(), 1);
/// assert!(!mesh.has_color());
/// ```
pub fn parse_str(text: &str, ids: &IdGenerator) -> PlyResult<TriangleMesh> {
    let lines: Vec<&str> = text.lines().collect();
    let header = parse_header(&lines)?;

    let body: Vec<(usize, &str)> = lines
        .iter()
        .enumerate()
        .skip(header.len)
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| (i + 1, *l))
        .collect();

    if body.len() < header.vertex_count {
        return Err(PlyError::Truncated {
            element: "vertex",
            expected: header.vertex_count,
            found: body.len(),
        });
    }
    let (vertex_lines, rest) = body.split_at(header.vertex_count);
    if rest.len() < header.face_count {
        return Err(PlyError::Truncated {
            element: "face",
            expected: header.face_count,
            found: rest.len(),
        });
    }
    let face_lines = &rest[..header.face_count];

    let vertices: Vec<(DVec3, Color)> = vertex_lines
        .par_iter()
        .map(|&(line, text)| parse_vertex(&header, line, text))
        .collect::<PlyResult<_>>()?;

    let faces: Vec<Option<[u32; 3]>> = face_lines
        .par_iter()
        .map(|&(line, text)| parse_face(line, text))
        .collect::<PlyResult<_>>()?;

    let skipped = faces.iter().filter(|f| f.is_none()).count();
    if skipped > 0 {
        tracing::warn!(skipped, "skipped non-triangle faces");
    }

    let indices: Vec<u32> = faces.into_iter().flatten().flatten().collect();
    let (positions, colors): (Vec<DVec3>, Vec<Color>) = vertices.into_iter().unzip();

    let mesh = if header.has_color {
        TriangleMesh::with_colors(ids, positions, colors, indices)?
    } else {
        TriangleMesh::new(ids, positions, indices)?
    };
    Ok(mesh)
}

/// Reads a whole PLY stream into a new mesh.
pub fn read<R: Read>(mut reader: R, ids: &IdGenerator) -> PlyResult<TriangleMesh> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_str(&text, ids)
}

/// Loads a PLY file. The mesh is named after the file (the last path
/// component, extension included).
pub fn load(path: impl AsRef<Path>, ids: &IdGenerator) -> PlyResult<TriangleMesh> {
    let path = path.as_ref();
    let mut mesh = read(File::open(path)?, ids)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    mesh.set_name(name);

    tracing::debug!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        color = mesh.has_color(),
        "loaded mesh"
    );
    Ok(mesh)
}

/// Writes positions and triangle indices as ASCII PLY.
///
/// Coordinates use Rust's shortest round-trip formatting, so reading the
/// output back yields bit-identical positions.
pub fn write<W: Write>(mut writer: W, positions: &[DVec3], indices: &[u32]) -> PlyResult<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", positions.len())?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    writeln!(writer, "element face {}", indices.len() / 3)?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    for p in positions {
        writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
    }
    for tri in indices.chunks_exact(3) {
        writeln!(writer, "3 {} {} {}", tri[0], tri[1], tri[2])?;
    }
    Ok(())
}

/// Saves a mesh with its transform baked into the positions.
pub fn save(path: impl AsRef<Path>, mesh: &TriangleMesh) -> PlyResult<()> {
    save_positions(path, &mesh.transformed_vertices(), mesh.indices())
}

/// Writes already-transformed positions and triangle indices to a file.
pub fn save_positions(
    path: impl AsRef<Path>,
    positions: &[DVec3],
    indices: &[u32],
) -> PlyResult<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer, positions, indices)?;
    writer.flush()?;

    tracing::debug!(
        path = %path.display(),
        vertices = positions.len(),
        triangles = indices.len() / 3,
        "saved mesh"
    );
    Ok(())
}
