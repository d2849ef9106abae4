//! Show how a handful of listings cluster as the map zooms in.
//!
//! Run with: RUST_LOG=info cargo run --example cluster_zoom

use spatial_grouping::{BoundingBox, ClusterIndex, ClusterNode, ClusterOptions, GeoPoint, GeoRecord};

fn main() {
    env_logger::init();

    // A few apartments in central Baku, two of them in the same building
    let records = vec![
        GeoRecord::new("flat-1", GeoPoint::new(40.37767, 49.85333), "2 bed, 95 m²"),
        GeoRecord::new("flat-2", GeoPoint::new(40.377671, 49.853331), "3 bed, 120 m²"),
        GeoRecord::new("flat-3", GeoPoint::new(40.37950, 49.84820), "1 bed, 48 m²"),
        GeoRecord::new("flat-4", GeoPoint::new(40.40930, 49.86710), "studio"),
        GeoRecord::new("house-1", GeoPoint::new(40.46200, 49.95100), "villa"),
        // Typo in the listing form
        GeoRecord::new("broken", GeoPoint::new(140.0, 49.8), "??"),
    ];

    let options = ClusterOptions::default();
    let index = ClusterIndex::build(records, &options);

    println!("Cluster Zoom Example\n");
    println!(
        "Config: radius={}px, extent={}px, zoom {}..={}, min_points={}\n",
        options.radius, options.extent, options.min_zoom, options.max_zoom, options.min_points
    );

    for rejected in index.rejected() {
        println!("Rejected {} at ({}, {})", rejected.id, rejected.coordinate.latitude, rejected.coordinate.longitude);
    }
    println!();

    let baku = BoundingBox::new(49.7, 40.3, 50.1, 40.6);
    for zoom in [8, 11, 13, 15, 17, 19] {
        let nodes = index.query(&baku, zoom);
        println!("Zoom {:>2}: {} markers", zoom, nodes.len());
        for node in &nodes {
            match node {
                ClusterNode::Cluster { coordinate, point_count, cluster_id } => {
                    let expands_at = index.expansion_zoom(*cluster_id).unwrap_or(zoom);
                    println!(
                        "   cluster of {} at ({:.4}, {:.4}), splits at zoom {}",
                        point_count, coordinate.latitude, coordinate.longitude, expands_at
                    );
                }
                ClusterNode::Point { record, exact_group_size, .. } => {
                    println!(
                        "   {} ({}) in a building with {} listing(s)",
                        record.id, record.payload, exact_group_size
                    );
                }
            }
        }
    }
}
