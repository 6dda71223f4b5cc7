//! Graph file reader.

use crate::format::{component_from_path, Header, HEADER_SIZE};
use crate::{IoError, Result};
use deg_feature::{ComponentType, FeatureError, FeatureSpace, FeatureSpaceRegistry};
use deg_graph::{RegularGraph, VertexId};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Read a graph file.
///
/// The component type is `component` if given, otherwise it is taken from
/// the file name (`graph.float.deg`), falling back to `float`. The feature
/// space is resolved from `registry` by the component type and the metric
/// and dimensions of the header.
///
/// # Errors
///
/// Fails before any vertex is decoded if no feature space matches or the
/// derived feature size differs from the space's. Fails on out-of-range
/// neighbor ids and duplicate labels.
pub fn read_graph<P: AsRef<Path>>(
    path: P,
    component: Option<ComponentType>,
    registry: &FeatureSpaceRegistry,
) -> Result<RegularGraph> {
    let path = path.as_ref();
    let component = component
        .or_else(|| component_from_path(path))
        .unwrap_or(ComponentType::Float);

    let file = File::open(path)?;
    let file_size = file.metadata()?.len() as usize;
    if file_size < HEADER_SIZE {
        return Err(IoError::Format(format!(
            "file too short for header: {} bytes",
            file_size
        )));
    }
    // SAFETY: the file is opened read-only and only read while mapped.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };

    let header = Header::decode(&mmap)?;
    let space = resolve_space(registry, component, &header)?;
    let feature_size = header.feature_byte_size(mmap.len())?;
    if header.vertex_count > 0 && feature_size != space.feature_byte_size() {
        return Err(IoError::Format(format!(
            "feature size in file is {} bytes, space expects {}",
            feature_size,
            space.feature_byte_size()
        )));
    }

    let graph = decode_vertices(&mmap[HEADER_SIZE..], &header, space, feature_size)?;
    tracing::debug!(
        path = %path.display(),
        vertices = graph.len(),
        edges_per_vertex = graph.edges_per_vertex(),
        "graph read"
    );
    Ok(graph)
}

fn resolve_space(
    registry: &FeatureSpaceRegistry,
    component: ComponentType,
    header: &Header,
) -> Result<Arc<dyn FeatureSpace>> {
    let dims = header.dims as usize;
    registry
        .find(component, header.metric, dims, false)
        .or_else(|| registry.find(component, header.metric, dims, true))
        .ok_or(IoError::Feature(FeatureError::UnknownSpace {
            component,
            metric: header.metric,
            dims,
        }))
}

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn decode_vertices(
    data: &[u8],
    header: &Header,
    space: Arc<dyn FeatureSpace>,
    feature_size: usize,
) -> Result<RegularGraph> {
    let count = header.vertex_count as usize;
    let epv = header.edges_per_vertex as usize;
    let record_size = feature_size + header.edge_record_size();
    let ids_offset = feature_size;
    let weights_offset = ids_offset + epv * 4;
    let label_offset = weights_offset + epv * 4;

    let mut graph = RegularGraph::with_capacity(epv, Arc::clone(&space), count);

    // vertices first, edges refer to later ids
    for i in 0..count {
        let record = &data[i * record_size..(i + 1) * record_size];
        let feature = space.read_feature(&record[..feature_size])?;
        let label = read_i32(record, label_offset);
        graph.add_vertex(label, feature)?;
    }

    for i in 0..count {
        let id = i as VertexId;
        let record = &data[i * record_size..(i + 1) * record_size];
        for slot in 0..epv {
            let neighbor = read_i32(record, ids_offset + slot * 4);
            let weight = read_f32(record, weights_offset + slot * 4);
            if neighbor < 0 || neighbor as usize >= count {
                return Err(IoError::Format(format!(
                    "vertex {} refers to neighbor {} of {} vertices",
                    i, neighbor, count
                )));
            }
            // self loops pad missing edges
            if neighbor as VertexId == id {
                continue;
            }
            graph.add_undirected_edge(id, neighbor as VertexId, weight);
        }
    }
    Ok(graph)
}
