//! # Spatial Grouping
//!
//! Proximity-based marker grouping for interactive listing maps.
//!
//! This library provides:
//! - Exact-coincidence grouping of listings that share a building-level coordinate
//! - A zoom-dependent cluster index answering viewport queries
//! - Popup placement that keeps detail cards inside the map container
//! - Paged views over the listings bound to one pin
//! - A render session that threads all of the above through UI events
//!
//! ## Features
//!
//! - **`serde`** - Serialize configs and render outputs
//! - **`parallel`** - Project records with rayon during index build
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use spatial_grouping::{BoundingBox, ClusterIndex, ClusterOptions, GeoPoint, GeoRecord};
//!
//! let records = vec![
//!     GeoRecord::new("flat-1", GeoPoint::new(40.4093, 49.8671), "2 bed"),
//!     GeoRecord::new("flat-2", GeoPoint::new(40.4094, 49.8672), "3 bed"),
//!     GeoRecord::new("house-1", GeoPoint::new(40.3700, 49.8300), "villa"),
//! ];
//!
//! let index = ClusterIndex::build(records, &ClusterOptions::default());
//!
//! // Zoomed out, the two flats collapse into a single cluster
//! let nodes = index.query(&BoundingBox::world(), 10);
//! let total: usize = nodes.iter().map(|n| n.point_count()).sum();
//! assert_eq!(total, 3);
//! ```

use std::sync::Arc;

pub mod error;
pub use error::{ClusterError, Result};

// Projection and bounding-box helpers
pub mod geo_utils;

// Exact-coincidence grouping (building-level precision)
pub mod exact;
pub use exact::{compute_exact_groups, ExactGroupKey, ExactGroups};

// Zoom-dependent cluster index
pub mod cluster;
pub use cluster::{ClusterId, ClusterIndex, ClusterNode, ClusterOptions, RejectedRecord};

// Popup placement
pub mod placement;
pub use placement::{
    resolve_anchor, HorizontalAnchor, PixelPoint, PixelSize, PlacementConfig, PopupAnchor,
    PopupPlacement, VerticalAnchor,
};

// Paged popup content
pub mod pagination;
pub use pagination::{make_window, PageWindow};

// Hover / pin popup state machine
pub mod hover;
pub use hover::{HoverEvent, HoverMachine, HoverOutcome, HoverState};

// Render session wiring everything together
pub mod session;
pub use session::{MarkerKey, OpenPopup, RenderSession, SessionConfig};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("SpatialGroupingRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use spatial_grouping::GeoPoint;
/// let point = GeoPoint::new(40.4093, 49.8671); // Baku
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has finite, in-range coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(p: GeoPoint) -> Self {
        geo::Point::new(p.longitude, p.latitude)
    }
}

impl From<geo::Point<f64>> for GeoPoint {
    fn from(p: geo::Point<f64>) -> Self {
        GeoPoint::new(p.y(), p.x())
    }
}

/// A map viewport in degrees, ordered `[west, south, east, north]`.
///
/// `west > east` describes a viewport that crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self { west, south, east, north }
    }

    /// The whole map.
    pub fn world() -> Self {
        Self::new(-180.0, -90.0, 180.0, 90.0)
    }

    /// Whether `point` lies inside the box (edges inclusive).
    pub fn contains(&self, point: &GeoPoint) -> bool {
        if point.latitude < self.south || point.latitude > self.north {
            return false;
        }
        if self.east - self.west >= 360.0 {
            return true;
        }
        let west = geo_utils::wrap_longitude(self.west);
        let east = geo_utils::wrap_longitude(self.east);
        if west <= east {
            point.longitude >= west && point.longitude <= east
        } else {
            point.longitude >= west || point.longitude <= east
        }
    }

    /// Get the center point of the box.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([west, south, east, north]: [f64; 4]) -> Self {
        Self::new(west, south, east, north)
    }
}

/// Anything that may sit at a map coordinate.
///
/// Implemented for [`GeoRecord`] and for shared or borrowed handles to it, so
/// grouping code can run over owned, borrowed or `Arc`-shared records alike.
pub trait Located {
    /// The record's coordinate, or `None` when it cannot be placed on a map.
    fn location(&self) -> Option<GeoPoint>;
}

impl<T: Located + ?Sized> Located for &T {
    fn location(&self) -> Option<GeoPoint> {
        (**self).location()
    }
}

impl<T: Located + ?Sized> Located for Arc<T> {
    fn location(&self) -> Option<GeoPoint> {
        (**self).location()
    }
}

/// One listing eligible for map placement.
///
/// `payload` carries whatever the host needs to render a card (price, title,
/// image reference); the engine never inspects it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoRecord<P> {
    /// Unique listing identifier
    pub id: String,
    /// Listing coordinate; records without one are invisible to the engine
    pub coordinate: Option<GeoPoint>,
    /// Opaque display data
    pub payload: P,
}

impl<P> GeoRecord<P> {
    /// Create a record placed at `coordinate`.
    pub fn new(id: impl Into<String>, coordinate: GeoPoint, payload: P) -> Self {
        Self {
            id: id.into(),
            coordinate: Some(coordinate),
            payload,
        }
    }

    /// Create a record with no coordinate. It will never be placed on the map.
    pub fn unplaced(id: impl Into<String>, payload: P) -> Self {
        Self {
            id: id.into(),
            coordinate: None,
            payload,
        }
    }
}

impl<P> Located for GeoRecord<P> {
    fn location(&self) -> Option<GeoPoint> {
        self.coordinate
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::info;

    /// A listing as seen across the FFI boundary. The payload travels as an
    /// opaque JSON string owned by the host.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiGeoRecord {
        pub id: String,
        pub coordinate: Option<GeoPoint>,
        pub payload_json: String,
    }

    impl From<FfiGeoRecord> for GeoRecord<String> {
        fn from(r: FfiGeoRecord) -> Self {
            GeoRecord {
                id: r.id,
                coordinate: r.coordinate,
                payload: r.payload_json,
            }
        }
    }

    impl From<&GeoRecord<String>> for FfiGeoRecord {
        fn from(r: &GeoRecord<String>) -> Self {
            FfiGeoRecord {
                id: r.id.clone(),
                coordinate: r.coordinate,
                payload_json: r.payload.clone(),
            }
        }
    }

    /// Flattened [`ClusterNode`]: `cluster_id` is set for clusters, `record`
    /// for single points.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiClusterNode {
        pub coordinate: GeoPoint,
        pub cluster_id: Option<ClusterId>,
        pub point_count: u32,
        pub record: Option<FfiGeoRecord>,
        pub exact_group_key: Option<String>,
        pub exact_group_size: u32,
    }

    impl From<ClusterNode<String>> for FfiClusterNode {
        fn from(node: ClusterNode<String>) -> Self {
            match node {
                ClusterNode::Cluster { coordinate, point_count, cluster_id } => FfiClusterNode {
                    coordinate,
                    cluster_id: Some(cluster_id),
                    point_count: point_count as u32,
                    record: None,
                    exact_group_key: None,
                    exact_group_size: 0,
                },
                ClusterNode::Point { coordinate, record, exact_group_key, exact_group_size } => {
                    FfiClusterNode {
                        coordinate,
                        cluster_id: None,
                        point_count: 1,
                        record: Some(FfiGeoRecord::from(record.as_ref())),
                        exact_group_key: Some(exact_group_key.to_string()),
                        exact_group_size: exact_group_size as u32,
                    }
                }
            }
        }
    }

    /// Cluster index handle for hosts that drive the map from Kotlin/Swift.
    #[derive(uniffi::Object)]
    pub struct FfiClusterEngine {
        index: ClusterIndex<String>,
    }

    #[uniffi::export]
    impl FfiClusterEngine {
        /// Build an index over `records`. Rebuild on every data refresh.
        #[uniffi::constructor]
        pub fn new(records: Vec<FfiGeoRecord>, options: ClusterOptions) -> Arc<Self> {
            init_logging();
            info!("[SpatialGroupingRust] building cluster engine over {} records", records.len());
            let records: Vec<GeoRecord<String>> = records.into_iter().map(Into::into).collect();
            Arc::new(Self {
                index: ClusterIndex::build(records, &options),
            })
        }

        pub fn query(&self, bbox: BoundingBox, zoom: u8) -> Vec<FfiClusterNode> {
            self.index
                .query(&bbox, zoom)
                .into_iter()
                .map(FfiClusterNode::from)
                .collect()
        }

        pub fn leaves(
            &self,
            cluster_id: ClusterId,
            limit: u32,
            offset: u32,
        ) -> std::result::Result<Vec<FfiGeoRecord>, ClusterError> {
            let leaves = self
                .index
                .leaves_page(cluster_id, limit as usize, offset as usize)?;
            Ok(leaves.iter().map(|r| FfiGeoRecord::from(r.as_ref())).collect())
        }

        pub fn expansion_zoom(&self, cluster_id: ClusterId) -> std::result::Result<u8, ClusterError> {
            self.index.expansion_zoom(cluster_id)
        }

        /// IDs of records excluded because of invalid coordinates.
        pub fn rejected_ids(&self) -> Vec<String> {
            self.index.rejected().iter().map(|r| r.id.clone()).collect()
        }
    }

    /// Exact-group key for a coordinate (4 fractional digits).
    #[uniffi::export]
    pub fn ffi_exact_group_key(point: GeoPoint) -> String {
        ExactGroupKey::from_point(point).to_string()
    }

    /// Resolve where a popup should anchor relative to its marker.
    #[uniffi::export]
    pub fn ffi_resolve_anchor(
        marker: PixelPoint,
        container: PixelSize,
        popup: PixelSize,
        config: PlacementConfig,
    ) -> PopupPlacement {
        resolve_anchor(marker, container, popup, &config)
    }

    /// Get default cluster options.
    #[uniffi::export]
    pub fn default_cluster_options() -> ClusterOptions {
        ClusterOptions::default()
    }

    /// Get default placement configuration.
    #[uniffi::export]
    pub fn default_placement_config() -> PlacementConfig {
        PlacementConfig::default()
    }
}

// ============================================================================
// Tests
// ============================================================================
