//! # Zoom-Dependent Cluster Index
//!
//! Hierarchical greedy clustering of map markers, one level per zoom.
//!
//! ## Algorithm
//! 1. Validate coordinates; invalid records are set aside as diagnostics
//! 2. Project every record onto the Web-Mercator unit square
//! 3. Starting one level past `max_zoom` (every record on its own), build the
//!    level for zoom `z` from level `z + 1`: each unvisited node absorbs all
//!    unvisited neighbours within `radius` pixels at `z`, found through an
//!    R-tree over level `z + 1`
//! 4. A group with at least `min_points` markers becomes a cluster at its
//!    weighted centroid; smaller groups pass through unchanged
//! 5. Queries range-search the leaf level with the (projected) viewport, then
//!    walk each matching record up to the requested zoom through parent links.
//!    A node is rendered once all of its records are in view, so clusters
//!    cut by the viewport edge split into their in-view descendants
//!
//! Exact-coincidence grouping runs alongside the build so single points can
//! carry a building-level badge count. It is computed over every valid
//! record handed to the build, including those hidden by the visibility
//! filter, so a pin still shows how many listings share its building.
//!
//! Each build stamps its cluster ids with a fresh generation number. An id
//! from a previous build is rejected with [`ClusterError::InvalidClusterId`]
//! rather than silently resolving to unrelated clusters.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};

use crate::error::{ClusterError, Result};
use crate::exact::{ExactGroupKey, ExactGroups};
use crate::geo_utils;
use crate::{BoundingBox, GeoPoint, GeoRecord};

// Marks a node no zoom level has claimed yet.
const UNVISITED: u8 = u8::MAX;

// Zoom levels beyond this add nothing at listing scale and would overflow
// the per-level radius.
const MAX_SUPPORTED_ZOOM: u8 = 30;

// Root nodes at min_zoom have nothing below them.
const NO_PARENT: usize = usize::MAX;

/// Mints build generations for [`ClusterId`]s; holds no index state.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Configuration for the cluster index.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ClusterOptions {
    /// Cluster radius in pixels. Larger values merge more aggressively.
    /// Default: 40
    pub radius: f64,

    /// Tile extent in pixels the radius is measured against.
    /// Default: 256
    pub extent: f64,

    /// Lowest zoom level that gets its own clustering level.
    /// Default: 0
    pub min_zoom: u8,

    /// Highest zoom level that clusters. Above it every record renders
    /// individually. Default: 18
    pub max_zoom: u8,

    /// Minimum number of markers that form a cluster. Values below 2 are
    /// treated as 2. Default: 2
    pub min_points: u32,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            radius: 40.0,
            extent: 256.0,
            min_zoom: 0,
            max_zoom: 18,
            min_points: 2,
        }
    }
}

impl ClusterOptions {
    fn normalized(&self) -> Self {
        let (min_zoom, max_zoom) = if self.min_zoom <= self.max_zoom {
            (self.min_zoom, self.max_zoom)
        } else {
            (self.max_zoom, self.min_zoom)
        };
        let max_zoom = max_zoom.min(MAX_SUPPORTED_ZOOM);
        Self {
            radius: self.radius.max(0.0),
            extent: if self.extent > 0.0 { self.extent } else { 256.0 },
            min_zoom: min_zoom.min(max_zoom),
            max_zoom,
            min_points: self.min_points.max(2),
        }
    }
}

/// Identifies a cluster within one index generation.
///
/// Only valid against the [`ClusterIndex`] whose query produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ClusterId {
    generation: u64,
    zoom: u8,
    slot: u32,
}

impl ClusterId {
    /// Zoom level at which the cluster was formed.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Build generation that issued this id.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.generation, self.zoom, self.slot)
    }
}

/// One renderable marker returned by [`ClusterIndex::query`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum ClusterNode<P> {
    /// Several nearby records collapsed at this zoom.
    Cluster {
        /// Weighted centroid of the members
        coordinate: GeoPoint,
        point_count: usize,
        cluster_id: ClusterId,
    },
    /// A single record. Its exact group may still hold other listings in the
    /// same building.
    Point {
        coordinate: GeoPoint,
        record: Arc<GeoRecord<P>>,
        exact_group_key: ExactGroupKey,
        exact_group_size: usize,
    },
}

impl<P> ClusterNode<P> {
    pub fn is_cluster(&self) -> bool {
        matches!(self, ClusterNode::Cluster { .. })
    }

    pub fn coordinate(&self) -> GeoPoint {
        match self {
            ClusterNode::Cluster { coordinate, .. } | ClusterNode::Point { coordinate, .. } => {
                *coordinate
            }
        }
    }

    /// Number of records behind this marker (1 for a point).
    pub fn point_count(&self) -> usize {
        match self {
            ClusterNode::Cluster { point_count, .. } => *point_count,
            ClusterNode::Point { .. } => 1,
        }
    }

    pub fn cluster_id(&self) -> Option<ClusterId> {
        match self {
            ClusterNode::Cluster { cluster_id, .. } => Some(*cluster_id),
            ClusterNode::Point { .. } => None,
        }
    }

    pub fn record(&self) -> Option<&Arc<GeoRecord<P>>> {
        match self {
            ClusterNode::Point { record, .. } => Some(record),
            ClusterNode::Cluster { .. } => None,
        }
    }
}

/// A record excluded from placement because its coordinate is out of range
/// or not finite.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RejectedRecord {
    pub id: String,
    pub coordinate: GeoPoint,
}

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Point { record: usize },
    Cluster { origin_zoom: u8, origin_slot: u32 },
}

#[derive(Debug, Clone)]
struct Node {
    pos: [f64; 2],
    point_count: usize,
    kind: NodeKind,
    /// Lowest zoom that has claimed this node so far
    visited: u8,
    /// Indices into the next-higher zoom level (clusters only)
    children: Vec<usize>,
    /// Index of the node absorbing or carrying this one, one zoom lower
    parent: usize,
}

impl Node {
    fn leaf(pos: [f64; 2], record: usize) -> Self {
        Self {
            pos,
            point_count: 1,
            kind: NodeKind::Point { record },
            visited: UNVISITED,
            children: Vec::new(),
            parent: NO_PARENT,
        }
    }

    /// Copy of this node for the next-lower zoom level.
    fn carried(&self) -> Self {
        Self {
            pos: self.pos,
            point_count: self.point_count,
            kind: self.kind,
            visited: UNVISITED,
            children: Vec::new(),
            parent: NO_PARENT,
        }
    }
}

type NodeRef = GeomWithData<[f64; 2], usize>;

#[derive(Debug)]
struct Level {
    nodes: Vec<Node>,
    tree: RTree<NodeRef>,
}

impl Level {
    fn new(nodes: Vec<Node>) -> Self {
        let refs: Vec<NodeRef> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| NodeRef::new(n.pos, i))
            .collect();
        Self {
            tree: RTree::bulk_load(refs),
            nodes,
        }
    }
}

#[derive(Debug)]
struct IndexedPoint<P> {
    record: Arc<GeoRecord<P>>,
    coordinate: GeoPoint,
    key: ExactGroupKey,
}

/// Spatial index answering "what markers are visible at this zoom".
///
/// Build once per data refresh; the index is immutable afterwards.
///
/// # Example
/// ```
/// use spatial_grouping::{BoundingBox, ClusterIndex, ClusterOptions, GeoPoint, GeoRecord};
///
/// let records = vec![
///     GeoRecord::new("a", GeoPoint::new(40.4093, 49.8671), ()),
///     GeoRecord::new("b", GeoPoint::new(40.4095, 49.8675), ()),
/// ];
/// let index = ClusterIndex::build(records, &ClusterOptions::default());
///
/// let nodes = index.query(&BoundingBox::world(), 5);
/// assert_eq!(nodes.len(), 1);
/// let id = nodes[0].cluster_id().unwrap();
///
/// assert_eq!(index.leaves(id, usize::MAX).unwrap().len(), 2);
/// let zoom = index.expansion_zoom(id).unwrap();
/// assert_eq!(index.query(&BoundingBox::world(), zoom).len(), 2);
/// ```
#[derive(Debug)]
pub struct ClusterIndex<P> {
    options: ClusterOptions,
    generation: u64,
    points: Vec<IndexedPoint<P>>,
    groups: ExactGroups<Arc<GeoRecord<P>>>,
    /// `levels[z - min_zoom]` for `z` in `min_zoom..=max_zoom + 1`
    levels: Vec<Level>,
    rejected: Vec<RejectedRecord>,
}

impl<P> ClusterIndex<P> {
    /// Build an index over every placeable record.
    pub fn build(records: Vec<GeoRecord<P>>, options: &ClusterOptions) -> Self {
        Self::build_filtered(records, |_| true, options)
    }

    /// Build an index that clusters only the records passing `visible`,
    /// while exact groups are computed over all of them.
    ///
    /// Pass the full, unfiltered record set so pins keep accurate building
    /// counts when the host applies search filters.
    pub fn build_filtered<F>(records: Vec<GeoRecord<P>>, visible: F, options: &ClusterOptions) -> Self
    where
        F: Fn(&GeoRecord<P>) -> bool,
    {
        let start = Instant::now();
        let options = options.normalized();
        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);

        let mut rejected = Vec::new();
        let mut placed: Vec<(Arc<GeoRecord<P>>, GeoPoint)> = Vec::with_capacity(records.len());
        for record in records {
            match record.coordinate {
                None => {}
                Some(coordinate) if !coordinate.is_valid() => {
                    warn!(
                        "[ClusterIndex] Skipping {}: invalid coordinate ({}, {})",
                        record.id, coordinate.latitude, coordinate.longitude
                    );
                    rejected.push(RejectedRecord { id: record.id, coordinate });
                }
                Some(coordinate) => placed.push((Arc::new(record), coordinate)),
            }
        }

        let groups = ExactGroups::partition(placed.iter().map(|(r, _)| Arc::clone(r)));

        let points: Vec<IndexedPoint<P>> = placed
            .into_iter()
            .filter(|(r, _)| visible(&**r))
            .map(|(record, coordinate)| IndexedPoint {
                key: ExactGroupKey::from_point(coordinate),
                record,
                coordinate,
            })
            .collect();

        let coordinates: Vec<GeoPoint> = points.iter().map(|p| p.coordinate).collect();
        let leaves: Vec<Node> = project_points(&coordinates)
            .into_iter()
            .enumerate()
            .map(|(i, pos)| Node::leaf(pos, i))
            .collect();

        // Build from the leaf level down to min_zoom
        let mut levels = Vec::with_capacity((options.max_zoom - options.min_zoom) as usize + 2);
        let mut level = Level::new(leaves);
        for zoom in (options.min_zoom..=options.max_zoom).rev() {
            let nodes = cluster_level(&mut level, zoom, &options);
            levels.push(level);
            level = Level::new(nodes);
        }
        levels.push(level);
        levels.reverse();

        info!(
            "[ClusterIndex] Indexed {} records ({} rejected, {} exact groups) across {} zoom levels in {:?}",
            points.len(),
            rejected.len(),
            groups.len(),
            levels.len(),
            start.elapsed()
        );

        Self {
            options,
            generation,
            points,
            groups,
            levels,
            rejected,
        }
    }

    /// Markers covering the records inside `bbox` at `zoom`.
    ///
    /// Every record whose coordinate lies in `bbox` (edges inclusive) is
    /// counted exactly once and no record outside it is counted. A cluster
    /// straddling the viewport edge is replaced by its largest descendants
    /// that lie wholly inside, down to single points.
    ///
    /// Zoom is clamped to `min_zoom..=max_zoom + 1`. Viewports crossing the
    /// antimeridian (`west > east`) are split in two. For a fixed index and
    /// input the result, including its order, is always the same.
    pub fn query(&self, bbox: &BoundingBox, zoom: u8) -> Vec<ClusterNode<P>> {
        let zoom = self.clamp_zoom(zoom);
        let leaf_zoom = self.options.max_zoom + 1;
        let Some(leaf_level) = self.level(leaf_zoom) else {
            return Vec::new();
        };

        let mut inside: Vec<usize> = Vec::new();
        for envelope in query_envelopes(bbox) {
            inside.extend(
                leaf_level
                    .tree
                    .locate_in_envelope(&envelope)
                    .map(|n| n.data)
                    .filter(|&i| bbox.contains(&self.points[i].coordinate)),
            );
        }
        inside.sort_unstable();
        inside.dedup();

        // Walk down from the requested zoom; a node is rendered once every
        // record beneath it is inside the viewport.
        let mut pending: Vec<Vec<usize>> = inside
            .into_iter()
            .map(|leaf| self.ancestor_chain(leaf, zoom))
            .collect();
        let mut nodes = Vec::new();
        for z in zoom..=leaf_zoom {
            let Some(level) = self.level(z) else {
                break;
            };
            let depth = (z - zoom) as usize;

            let mut groups: BTreeMap<usize, Vec<Vec<usize>>> = BTreeMap::new();
            for chain in pending {
                if let Some(&node) = chain.get(depth) {
                    groups.entry(node).or_default().push(chain);
                }
            }

            pending = Vec::new();
            for (i, members) in groups {
                let Some(node) = level.nodes.get(i) else {
                    continue;
                };
                if members.len() == node.point_count {
                    nodes.push(self.render_node(node));
                } else {
                    pending.extend(members);
                }
            }
            if pending.is_empty() {
                break;
            }
        }
        nodes
    }

    /// Immediate children of a cluster, one zoom level in.
    pub fn children(&self, id: ClusterId) -> Result<Vec<ClusterNode<P>>> {
        let node = self.cluster_node(id)?;
        let level = self
            .level(id.zoom + 1)
            .ok_or_else(|| ClusterError::invalid(id, "cluster has no child level"))?;
        Ok(node
            .children
            .iter()
            .map(|&c| self.render_node(&level.nodes[c]))
            .collect())
    }

    /// Up to `limit` records inside a cluster. Pass `usize::MAX` for all.
    pub fn leaves(&self, id: ClusterId, limit: usize) -> Result<Vec<Arc<GeoRecord<P>>>> {
        self.leaves_page(id, limit, 0)
    }

    /// Records inside a cluster, skipping the first `offset`.
    pub fn leaves_page(
        &self,
        id: ClusterId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Arc<GeoRecord<P>>>> {
        let node = self.cluster_node(id)?;
        let mut out = Vec::new();
        let mut skipped = 0;
        self.collect_leaves(id.zoom, node, limit, offset, &mut skipped, &mut out);
        Ok(out)
    }

    /// The zoom at which a cluster first splits into more than one marker.
    pub fn expansion_zoom(&self, id: ClusterId) -> Result<u8> {
        let mut current = id;
        loop {
            let node = self.cluster_node(current)?;
            let next_zoom = current.zoom + 1;
            if node.children.len() != 1 {
                return Ok(next_zoom);
            }
            let child = self
                .level(next_zoom)
                .and_then(|level| level.nodes.get(node.children[0]));
            match child.map(|c| c.kind) {
                Some(NodeKind::Cluster { origin_zoom, origin_slot }) => {
                    current = self.cluster_id(origin_zoom, origin_slot);
                }
                _ => return Ok(next_zoom),
            }
        }
    }

    /// Bounding box of a cluster's records, for fitting the map to it.
    pub fn cluster_bounds(&self, id: ClusterId) -> Result<BoundingBox> {
        let leaves = self.leaves(id, usize::MAX)?;
        geo_utils::bounds_of(leaves.iter().filter_map(|r| r.coordinate))
            .ok_or_else(|| ClusterError::invalid(id, "cluster has no placed records"))
    }

    /// All records sharing the exact group `key`, including ones hidden by
    /// the visibility filter.
    pub fn exact_group(&self, key: &ExactGroupKey) -> &[Arc<GeoRecord<P>>] {
        self.groups.get(key).unwrap_or(&[])
    }

    pub fn exact_groups(&self) -> &ExactGroups<Arc<GeoRecord<P>>> {
        &self.groups
    }

    /// Records excluded for invalid coordinates.
    pub fn rejected(&self) -> &[RejectedRecord] {
        &self.rejected
    }

    /// Number of clustered (visible, valid) records.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    fn clamp_zoom(&self, zoom: u8) -> u8 {
        zoom.clamp(self.options.min_zoom, self.options.max_zoom + 1)
    }

    fn level(&self, zoom: u8) -> Option<&Level> {
        let offset = zoom.checked_sub(self.options.min_zoom)?;
        self.levels.get(offset as usize)
    }

    fn cluster_id(&self, zoom: u8, slot: u32) -> ClusterId {
        ClusterId {
            generation: self.generation,
            zoom,
            slot,
        }
    }

    fn cluster_node(&self, id: ClusterId) -> Result<&Node> {
        if id.generation != self.generation {
            debug!(
                "[ClusterIndex] Rejecting id {} against generation {}",
                id, self.generation
            );
            return Err(ClusterError::invalid(id, "issued by a different index generation"));
        }
        if id.zoom < self.options.min_zoom || id.zoom > self.options.max_zoom {
            return Err(ClusterError::invalid(id, "zoom outside the clustered range"));
        }
        let node = self
            .level(id.zoom)
            .and_then(|level| level.nodes.get(id.slot as usize))
            .ok_or_else(|| ClusterError::invalid(id, "no marker at this slot"))?;
        match node.kind {
            NodeKind::Cluster { origin_zoom, origin_slot }
                if origin_zoom == id.zoom && origin_slot == id.slot =>
            {
                Ok(node)
            }
            _ => Err(ClusterError::invalid(id, "marker is not a cluster")),
        }
    }

    /// Node indices holding leaf `leaf` at each zoom from `zoom` down to the
    /// leaf level; `chain[k]` is the node at `zoom + k`.
    fn ancestor_chain(&self, leaf: usize, zoom: u8) -> Vec<usize> {
        let leaf_zoom = self.options.max_zoom + 1;
        let mut chain = vec![NO_PARENT; (leaf_zoom - zoom) as usize + 1];
        let mut current = leaf;
        for z in (zoom..=leaf_zoom).rev() {
            chain[(z - zoom) as usize] = current;
            if z == zoom {
                break;
            }
            match self.level(z).and_then(|level| level.nodes.get(current)) {
                Some(node) => current = node.parent,
                None => break,
            }
        }
        chain
    }

    fn collect_leaves(
        &self,
        zoom: u8,
        node: &Node,
        limit: usize,
        offset: usize,
        skipped: &mut usize,
        out: &mut Vec<Arc<GeoRecord<P>>>,
    ) {
        let Some(level) = self.level(zoom + 1) else {
            return;
        };
        for &c in &node.children {
            if out.len() >= limit {
                return;
            }
            let child = &level.nodes[c];
            match child.kind {
                NodeKind::Point { record } => {
                    if *skipped < offset {
                        *skipped += 1;
                    } else {
                        out.push(Arc::clone(&self.points[record].record));
                    }
                }
                NodeKind::Cluster { origin_zoom, origin_slot } => {
                    if *skipped + child.point_count <= offset {
                        *skipped += child.point_count;
                        continue;
                    }
                    let origin = self
                        .level(origin_zoom)
                        .and_then(|l| l.nodes.get(origin_slot as usize));
                    if let Some(origin) = origin {
                        self.collect_leaves(origin_zoom, origin, limit, offset, skipped, out);
                    }
                }
            }
        }
    }

    fn render_node(&self, node: &Node) -> ClusterNode<P> {
        match node.kind {
            NodeKind::Cluster { origin_zoom, origin_slot } => ClusterNode::Cluster {
                coordinate: geo_utils::unproject(node.pos),
                point_count: node.point_count,
                cluster_id: self.cluster_id(origin_zoom, origin_slot),
            },
            NodeKind::Point { record } => {
                let point = &self.points[record];
                ClusterNode::Point {
                    coordinate: point.coordinate,
                    record: Arc::clone(&point.record),
                    exact_group_key: point.key.clone(),
                    exact_group_size: self.groups.size_of(&point.key),
                }
            }
        }
    }
}

/// Build the nodes for `zoom` out of the level one zoom higher.
fn cluster_level(level: &mut Level, zoom: u8, options: &ClusterOptions) -> Vec<Node> {
    let r = geo_utils::zoom_radius(options.radius, options.extent, zoom);
    let min_points = options.min_points as usize;
    let mut next: Vec<Node> = Vec::new();

    for i in 0..level.nodes.len() {
        if level.nodes[i].visited <= zoom {
            continue;
        }
        level.nodes[i].visited = zoom;

        let pos = level.nodes[i].pos;
        let mut neighbors: Vec<usize> = level
            .tree
            .locate_within_distance(pos, r * r)
            .map(|n| n.data)
            .collect();
        // Tree order is not stable across builds
        neighbors.sort_unstable();

        let mut count = level.nodes[i].point_count;
        for &j in &neighbors {
            if level.nodes[j].visited > zoom {
                count += level.nodes[j].point_count;
            }
        }

        if count >= min_points {
            let slot = next.len();
            level.nodes[i].parent = slot;
            let weight = level.nodes[i].point_count as f64;
            let mut wx = pos[0] * weight;
            let mut wy = pos[1] * weight;
            let mut children = vec![i];

            for j in neighbors {
                let b = &mut level.nodes[j];
                if b.visited <= zoom {
                    continue;
                }
                b.visited = zoom;
                b.parent = slot;
                let w = b.point_count as f64;
                wx += b.pos[0] * w;
                wy += b.pos[1] * w;
                children.push(j);
            }

            next.push(Node {
                pos: [wx / count as f64, wy / count as f64],
                point_count: count,
                kind: NodeKind::Cluster {
                    origin_zoom: zoom,
                    origin_slot: slot as u32,
                },
                visited: UNVISITED,
                children,
                parent: NO_PARENT,
            });
        } else {
            level.nodes[i].parent = next.len();
            next.push(level.nodes[i].carried());
            if count > 1 {
                for j in neighbors {
                    let b = &mut level.nodes[j];
                    if b.visited <= zoom {
                        continue;
                    }
                    b.visited = zoom;
                    b.parent = next.len();
                    next.push(b.carried());
                }
            }
        }
    }

    next
}

#[cfg(feature = "parallel")]
fn project_points(points: &[GeoPoint]) -> Vec<[f64; 2]> {
    use rayon::prelude::*;
    points.par_iter().map(|p| geo_utils::project(*p)).collect()
}

#[cfg(not(feature = "parallel"))]
fn project_points(points: &[GeoPoint]) -> Vec<[f64; 2]> {
    points.iter().map(|p| geo_utils::project(*p)).collect()
}

/// Projected search rectangles for a viewport, split at the antimeridian.
fn query_envelopes(bbox: &BoundingBox) -> Vec<AABB<[f64; 2]>> {
    let south = geo_utils::clamp_latitude(bbox.south);
    let north = geo_utils::clamp_latitude(bbox.north);

    if bbox.east - bbox.west >= 360.0 {
        return vec![envelope(-180.0, south, 180.0, north)];
    }

    let west = geo_utils::wrap_longitude(bbox.west);
    let east = geo_utils::wrap_longitude(bbox.east);
    if west > east {
        vec![
            envelope(west, south, 180.0, north),
            envelope(-180.0, south, east, north),
        ]
    } else {
        vec![envelope(west, south, east, north)]
    }
}

// Widens envelopes so projection rounding cannot drop a record on the edge;
// candidates are re-checked in degrees.
const ENVELOPE_SLACK: f64 = 1e-9;

fn envelope(west: f64, south: f64, east: f64, north: f64) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [
            geo_utils::lng_x(west) - ENVELOPE_SLACK,
            geo_utils::lat_y(north) - ENVELOPE_SLACK,
        ],
        [
            geo_utils::lng_x(east) + ENVELOPE_SLACK,
            geo_utils::lat_y(south) + ENVELOPE_SLACK,
        ],
    )
}
