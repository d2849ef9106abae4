//! Drive a render session the way a map UI would: load, pan, hover, page.
//!
//! Run with: RUST_LOG=debug cargo run --example map_session

use std::time::{Duration, Instant};

use spatial_grouping::{
    BoundingBox, GeoPoint, GeoRecord, HoverEvent, MarkerKey, PixelPoint, PixelSize,
    RenderSession, SessionConfig,
};

#[derive(Debug)]
struct Listing {
    price: u32,
    rooms: u8,
    available: bool,
}

fn main() {
    env_logger::init();

    let tower = GeoPoint::new(40.37767, 49.85333);
    let records = vec![
        GeoRecord::new("t-101", tower, Listing { price: 900, rooms: 2, available: true }),
        GeoRecord::new("t-204", tower, Listing { price: 1200, rooms: 3, available: true }),
        GeoRecord::new("t-305", tower, Listing { price: 650, rooms: 1, available: false }),
        GeoRecord::new("t-402", tower, Listing { price: 1500, rooms: 4, available: true }),
        GeoRecord::new("loft", GeoPoint::new(40.3795, 49.8482), Listing { price: 800, rooms: 1, available: true }),
        GeoRecord::unplaced("draft", Listing { price: 0, rooms: 0, available: true }),
    ];

    let mut session = RenderSession::new(SessionConfig::default());
    let rejected = session.load(records, |r| r.payload.available);
    println!("Loaded ({} rejected)\n", rejected.len());

    let container = PixelSize::new(1024.0, 768.0);
    let popup = PixelSize::new(340.0, 280.0);
    let viewport = BoundingBox::new(49.80, 40.35, 49.90, 40.40);

    // Zoomed out: one cluster for the neighbourhood
    let nodes = session.update_viewport(&viewport, 12);
    println!("Zoom 12: {} marker(s)", nodes.len());
    let Some(first) = nodes.first() else {
        return;
    };
    let cluster_key = MarkerKey::from(first);

    let now = Instant::now();
    session.handle_hover(HoverEvent::MarkerEnter(cluster_key.clone()), now);
    if let Ok(Some(open)) = session.open_popup(&cluster_key, PixelPoint::new(512.0, 120.0), container, popup) {
        println!(
            "   hover popup anchored {} listing {} records over {} page(s)",
            open.placement.anchor(),
            open.window.total(),
            open.window.page_count()
        );
    }
    session.handle_hover(HoverEvent::MarkerLeave(cluster_key.clone()), now);
    session.poll(now + Duration::from_millis(500));
    println!("   pointer left, popup open: {}\n", session.popup().is_some());

    // Zoomed in: the tower is a single pin with a building badge
    let nodes = session.update_viewport(&viewport, 19);
    println!("Zoom 19: {} marker(s)", nodes.len());
    let Some(pin) = nodes.iter().find(|n| !n.is_cluster() && n.record().is_some_and(|r| r.id == "t-101")) else {
        return;
    };
    let pin_key = MarkerKey::from(pin);

    session.handle_hover(HoverEvent::MarkerClick(pin_key.clone()), now);
    if let Ok(Some(open)) = session.open_popup(&pin_key, PixelPoint::new(30.0, 700.0), container, popup) {
        println!("   pinned popup anchored {}", open.placement.anchor());
    }

    let mut window = session.popup().map(|p| p.window.clone());
    while let Some(page) = window {
        let listings: Vec<String> = page
            .page_items()
            .iter()
            .map(|r| format!("{} ({} rooms, {} AZN)", r.id, r.payload.rooms, r.payload.price))
            .collect();
        println!("   page {}/{}: {}", page.page_index() + 1, page.page_count(), listings.join(", "));
        window = if page.has_next() {
            session.next_page().cloned()
        } else {
            None
        };
    }
}
