//! Graph file writer.

use crate::format::Header;
use crate::{IoError, Result};
use deg_graph::{RegularGraph, VertexId};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Write `graph` to `path`.
///
/// The file is written beside the target as `~$<name>`, synced and renamed
/// into place, so readers never observe a partial file.
pub fn write_graph<P: AsRef<Path>>(graph: &RegularGraph, path: P) -> Result<()> {
    let path = path.as_ref();
    let header = header_for(graph)?;
    let temp_path = temp_path(path)?;

    let file = File::create(&temp_path)?;
    let mut writer = BufWriter::new(file);
    if let Err(e) = write_records(graph, header, &mut writer) {
        drop(writer);
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);

    // Atomic rename
    fs::rename(&temp_path, path)?;

    // Fsync directory to ensure rename is durable
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(dir)?.sync_all()?;

    tracing::debug!(
        path = %path.display(),
        vertices = graph.len(),
        edges_per_vertex = graph.edges_per_vertex(),
        "graph written"
    );
    Ok(())
}

fn header_for(graph: &RegularGraph) -> Result<Header> {
    let space = graph.space();
    let dims = u16::try_from(space.dims())
        .map_err(|_| IoError::Format(format!("{} dimensions exceed u16", space.dims())))?;
    let vertex_count = u32::try_from(graph.len())
        .map_err(|_| IoError::Format(format!("{} vertices exceed u32", graph.len())))?;
    let edges_per_vertex = u8::try_from(graph.edges_per_vertex()).map_err(|_| {
        IoError::Format(format!(
            "{} edges per vertex exceed u8",
            graph.edges_per_vertex()
        ))
    })?;

    Ok(Header {
        metric: space.metric(),
        dims,
        vertex_count,
        edges_per_vertex,
    })
}

fn temp_path(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| IoError::Format(format!("invalid file name: {}", path.display())))?;
    Ok(path.with_file_name(format!("~${}", name)))
}

fn write_records<W: Write>(graph: &RegularGraph, header: Header, writer: &mut W) -> Result<()> {
    writer.write_all(&header.encode())?;

    let epv = graph.edges_per_vertex();
    let feature_size = graph.space().feature_byte_size();
    let mut feature_buf = Vec::with_capacity(feature_size);
    let mut edges: Vec<(VertexId, f32)> = Vec::with_capacity(epv);

    for (id, vertex) in graph.vertices() {
        feature_buf.clear();
        vertex.feature().write_le(&mut feature_buf);
        if feature_buf.len() != feature_size {
            return Err(IoError::Format(format!(
                "feature of vertex {} has {} bytes, expected {}",
                id,
                feature_buf.len(),
                feature_size
            )));
        }
        writer.write_all(&feature_buf)?;

        edges.clear();
        edges.extend(vertex.edges().iter());
        if edges.len() > epv {
            return Err(IoError::Format(format!(
                "vertex {} has {} edges, more than {}",
                id,
                edges.len(),
                epv
            )));
        }
        edges.sort_unstable_by_key(|&(neighbor, _)| neighbor);
        // pad with self loops
        edges.resize(epv, (id, 0.0));

        for &(neighbor, _) in &edges {
            writer.write_all(&(neighbor as i32).to_le_bytes())?;
        }
        for &(_, weight) in &edges {
            writer.write_all(&weight.to_le_bytes())?;
        }
        writer.write_all(&vertex.label().to_le_bytes())?;
    }
    Ok(())
}
