//! # Render Session
//!
//! Per-map state threaded through the host's UI event handlers: the current
//! index, the markers on screen, and the popup that is open.
//!
//! ## Event flow
//!
//! | Host event | Call |
//! |------------|------|
//! | data loaded / filters changed | [`RenderSession::load`] |
//! | pan or zoom end | [`RenderSession::update_viewport`] |
//! | pointer over/out, click | [`RenderSession::handle_hover`] |
//! | animation frame or timer | [`RenderSession::poll`] |
//! | popup shown | [`RenderSession::open_popup`] |
//! | page arrows | [`RenderSession::next_page`] / [`RenderSession::prev_page`] |
//! | cluster click-to-zoom | [`RenderSession::expansion_zoom_for`] |
//!
//! The session is single-owner and synchronous. A reload replaces everything:
//! the index, the rendered markers, the hover state and any open popup.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::cluster::{ClusterId, ClusterIndex, ClusterNode, ClusterOptions, RejectedRecord};
use crate::error::{ClusterError, Result};
use crate::exact::ExactGroupKey;
use crate::hover::{HoverEvent, HoverMachine, HoverOutcome};
use crate::pagination::{make_window, PageWindow};
use crate::placement::{resolve_anchor, PixelPoint, PixelSize, PlacementConfig, PopupPlacement};
use crate::{BoundingBox, GeoRecord};

/// Session settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    pub cluster: ClusterOptions,
    pub placement: PlacementConfig,
    /// Listings per popup page. Default: 2
    pub page_size: usize,
    /// How long a hover popup survives after the pointer leaves.
    /// Default: 300
    pub hover_close_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterOptions::default(),
            placement: PlacementConfig::default(),
            page_size: 2,
            hover_close_delay_ms: 300,
        }
    }
}

/// Identifies a rendered marker across events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MarkerKey {
    Cluster(ClusterId),
    /// A single point, by record id
    Point(String),
}

impl<P> From<&ClusterNode<P>> for MarkerKey {
    fn from(node: &ClusterNode<P>) -> Self {
        match node {
            ClusterNode::Cluster { cluster_id, .. } => MarkerKey::Cluster(*cluster_id),
            ClusterNode::Point { record, .. } => MarkerKey::Point(record.id.clone()),
        }
    }
}

/// The popup currently on screen.
#[derive(Debug, Clone)]
pub struct OpenPopup<P> {
    pub key: MarkerKey,
    pub placement: PopupPlacement,
    /// Cluster leaves, or the members of a point's exact group
    pub window: PageWindow<Arc<GeoRecord<P>>>,
}

/// Map state owned by one rendering surface.
///
/// # Example
/// ```
/// use std::time::Instant;
/// use spatial_grouping::{
///     BoundingBox, GeoPoint, GeoRecord, HoverEvent, MarkerKey, PixelPoint, PixelSize,
///     RenderSession, SessionConfig,
/// };
///
/// let mut session = RenderSession::new(SessionConfig::default());
/// let records = vec![
///     GeoRecord::new("a", GeoPoint::new(40.4093, 49.8671), ()),
///     GeoRecord::new("b", GeoPoint::new(40.4093, 49.8671), ()),
///     GeoRecord::new("c", GeoPoint::new(40.4093, 49.8671), ()),
/// ];
/// session.load(records, |_| true);
///
/// // Zoomed all the way in, the building shows as three points
/// let nodes = session.update_viewport(&BoundingBox::world(), 19);
/// let key = MarkerKey::from(&nodes[0]);
///
/// session.handle_hover(HoverEvent::MarkerClick(key.clone()), Instant::now());
/// let popup = session
///     .open_popup(&key, PixelPoint::new(400.0, 300.0), PixelSize::new(800.0, 600.0), PixelSize::new(340.0, 280.0))
///     .unwrap()
///     .unwrap();
/// assert_eq!(popup.window.total(), 3);
/// assert_eq!(popup.window.page_count(), 2);
/// ```
#[derive(Debug)]
pub struct RenderSession<P> {
    config: SessionConfig,
    index: Option<ClusterIndex<P>>,
    nodes: Vec<ClusterNode<P>>,
    hover: HoverMachine<MarkerKey>,
    popup: Option<OpenPopup<P>>,
}

impl<P> RenderSession<P> {
    pub fn new(config: SessionConfig) -> Self {
        let hover = HoverMachine::new(Duration::from_millis(config.hover_close_delay_ms));
        Self {
            config,
            index: None,
            nodes: Vec::new(),
            hover,
            popup: None,
        }
    }

    /// Rebuild from a fresh record set.
    ///
    /// `all` is the unfiltered data; `visible` selects what gets clustered
    /// and rendered. Exact groups always cover `all`. Returns the records
    /// excluded for invalid coordinates.
    pub fn load<F>(&mut self, all: Vec<GeoRecord<P>>, visible: F) -> &[RejectedRecord]
    where
        F: Fn(&GeoRecord<P>) -> bool,
    {
        let index = ClusterIndex::build_filtered(all, visible, &self.config.cluster);
        info!(
            "[RenderSession] Loaded generation {} with {} visible records",
            index.generation(),
            index.len()
        );

        self.nodes.clear();
        self.popup = None;
        self.hover = HoverMachine::new(Duration::from_millis(self.config.hover_close_delay_ms));
        self.index.insert(index).rejected()
    }

    /// Re-query for a new viewport. The previous markers are discarded.
    pub fn update_viewport(&mut self, bbox: &BoundingBox, zoom: u8) -> &[ClusterNode<P>] {
        self.nodes = match &self.index {
            Some(index) => index.query(bbox, zoom),
            None => Vec::new(),
        };
        debug!(
            "[RenderSession] Viewport at zoom {} renders {} markers",
            zoom,
            self.nodes.len()
        );
        &self.nodes
    }

    /// Markers from the most recent viewport update.
    pub fn nodes(&self) -> &[ClusterNode<P>] {
        &self.nodes
    }

    pub fn index(&self) -> Option<&ClusterIndex<P>> {
        self.index.as_ref()
    }

    /// Place and fill the popup for `key`.
    ///
    /// Clusters list their leaves; points list every record in their exact
    /// group, including ones hidden by the current filter. The page resets
    /// to 0 on every open.
    ///
    /// Returns `Ok(None)` when `key` is a point not currently rendered.
    ///
    /// # Errors
    /// [`ClusterError::InvalidClusterId`] for a cluster from another load.
    pub fn open_popup(
        &mut self,
        key: &MarkerKey,
        marker: PixelPoint,
        container: PixelSize,
        popup_size: PixelSize,
    ) -> Result<Option<&OpenPopup<P>>> {
        let members = match key {
            MarkerKey::Cluster(id) => self.index_for(*id)?.leaves(*id, usize::MAX)?,
            MarkerKey::Point(record_id) => {
                let (Some(index), Some(group_key)) = (&self.index, self.point_group(record_id))
                else {
                    return Ok(None);
                };
                index.exact_group(group_key).to_vec()
            }
        };

        let placement = resolve_anchor(marker, container, popup_size, &self.config.placement);
        let window = match self.popup.take() {
            Some(open) => open.window.rebind(members),
            None => make_window(members, self.config.page_size),
        };
        debug!(
            "[RenderSession] Popup for {:?} anchored {} with {} records",
            key,
            placement.anchor(),
            window.total()
        );

        let open = self.popup.insert(OpenPopup {
            key: key.clone(),
            placement,
            window,
        });
        Ok(Some(&*open))
    }

    pub fn popup(&self) -> Option<&OpenPopup<P>> {
        self.popup.as_ref()
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    pub fn next_page(&mut self) -> Option<&PageWindow<Arc<GeoRecord<P>>>> {
        self.step_page(PageWindow::next)
    }

    pub fn prev_page(&mut self) -> Option<&PageWindow<Arc<GeoRecord<P>>>> {
        self.step_page(PageWindow::prev)
    }

    /// Feed a pointer event through the hover state machine. A close drops
    /// the open popup.
    pub fn handle_hover(&mut self, event: HoverEvent<MarkerKey>, now: Instant) -> HoverOutcome<MarkerKey> {
        let outcome = self.hover.handle(event, now);
        self.after_hover(&outcome);
        outcome
    }

    /// Let a pending delayed close fire.
    pub fn poll(&mut self, now: Instant) -> HoverOutcome<MarkerKey> {
        let outcome = self.hover.poll(now);
        self.after_hover(&outcome);
        outcome
    }

    /// Marker whose popup is showing, pinned or hovered.
    pub fn active_marker(&self) -> Option<&MarkerKey> {
        self.hover.active()
    }

    /// Marker whose popup was pinned by a click.
    pub fn pinned_marker(&self) -> Option<&MarkerKey> {
        if self.hover.is_pinned() {
            self.hover.active()
        } else {
            None
        }
    }

    /// Zoom to animate to when a cluster is clicked.
    pub fn expansion_zoom_for(&self, id: ClusterId) -> Result<u8> {
        self.index_for(id)?.expansion_zoom(id)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn index_for(&self, id: ClusterId) -> Result<&ClusterIndex<P>> {
        self.index
            .as_ref()
            .ok_or_else(|| ClusterError::invalid(id, "no records loaded"))
    }

    fn point_group(&self, record_id: &str) -> Option<&ExactGroupKey> {
        self.nodes.iter().find_map(|node| match node {
            ClusterNode::Point { record, exact_group_key, .. } if record.id == record_id => {
                Some(exact_group_key)
            }
            _ => None,
        })
    }

    fn step_page<F>(&mut self, step: F) -> Option<&PageWindow<Arc<GeoRecord<P>>>>
    where
        F: FnOnce(PageWindow<Arc<GeoRecord<P>>>) -> PageWindow<Arc<GeoRecord<P>>>,
    {
        let open = self.popup.take()?;
        let open = self.popup.insert(OpenPopup {
            window: step(open.window),
            ..open
        });
        Some(&open.window)
    }

    fn after_hover(&mut self, outcome: &HoverOutcome<MarkerKey>) {
        match outcome {
            HoverOutcome::Closed => self.popup = None,
            HoverOutcome::Opened(key) | HoverOutcome::Pinned(key) => {
                if self.popup.as_ref().is_some_and(|p| &p.key != key) {
                    self.popup = None;
                }
            }
            HoverOutcome::Unchanged => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoPoint;

    const MARKER: PixelPoint = PixelPoint { x: 400.0, y: 500.0 };
    const CONTAINER: PixelSize = PixelSize { width: 800.0, height: 600.0 };
    const POPUP: PixelSize = PixelSize { width: 340.0, height: 280.0 };

    fn listing(id: &str, lat: f64, lng: f64) -> GeoRecord<&'static str> {
        GeoRecord::new(id, GeoPoint::new(lat, lng), "card")
    }

    fn loaded_session() -> RenderSession<&'static str> {
        let mut session = RenderSession::new(SessionConfig::default());
        session.load(
            vec![
                listing("tower-1", 40.4093, 49.8671),
                listing("tower-2", 40.4093, 49.8671),
                listing("tower-3", 40.40931, 49.86711),
                listing("villa", 40.3700, 49.8300),
                listing("sold", 40.4093, 49.8671),
            ],
            |r| r.id != "sold",
        );
        session
    }

    #[test]
    fn test_empty_session_renders_nothing() {
        let mut session: RenderSession<()> = RenderSession::new(SessionConfig::default());
        assert!(session.update_viewport(&BoundingBox::world(), 10).is_empty());
        assert!(session.next_page().is_none());
    }

    #[test]
    fn test_cluster_popup_pages_through_leaves() {
        let mut session = loaded_session();
        let nodes = session.update_viewport(&BoundingBox::world(), 2);
        assert_eq!(nodes.len(), 1);
        let key = MarkerKey::from(&nodes[0]);

        let popup = session.open_popup(&key, MARKER, CONTAINER, POPUP).unwrap().unwrap();
        assert_eq!(popup.window.total(), 4);
        assert_eq!(popup.window.page_count(), 2);
        assert_eq!(popup.placement.anchor().as_str(), "bottom");

        assert_eq!(session.next_page().unwrap().page_index(), 1);
        assert_eq!(session.next_page().unwrap().page_index(), 1);
        assert_eq!(session.prev_page().unwrap().page_index(), 0);
    }

    #[test]
    fn test_point_popup_lists_hidden_group_members() {
        let mut session = loaded_session();
        session.update_viewport(&BoundingBox::world(), 19);
        let key = MarkerKey::Point("tower-1".to_string());

        let popup = session.open_popup(&key, MARKER, CONTAINER, POPUP).unwrap().unwrap();
        let ids: Vec<&str> = popup.window.items().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["tower-1", "tower-2", "tower-3", "sold"]);
    }

    #[test]
    fn test_point_not_on_screen_has_no_popup() {
        let mut session = loaded_session();
        session.update_viewport(&BoundingBox::world(), 19);
        let key = MarkerKey::Point("sold".to_string());
        assert!(session.open_popup(&key, MARKER, CONTAINER, POPUP).unwrap().is_none());
    }

    #[test]
    fn test_reopening_resets_page() {
        let mut session = loaded_session();
        let key = MarkerKey::from(&session.update_viewport(&BoundingBox::world(), 2)[0]);

        session.open_popup(&key, MARKER, CONTAINER, POPUP).unwrap();
        session.next_page();
        let popup = session.open_popup(&key, MARKER, CONTAINER, POPUP).unwrap().unwrap();
        assert_eq!(popup.window.page_index(), 0);
    }

    #[test]
    fn test_reload_invalidates_cluster_ids() {
        let mut session = loaded_session();
        let id = session.update_viewport(&BoundingBox::world(), 2)[0]
            .cluster_id()
            .unwrap();
        assert!(session.expansion_zoom_for(id).is_ok());

        session.load(vec![listing("solo", 1.0, 1.0), listing("pair", 1.0, 1.0)], |_| true);
        assert!(session.nodes().is_empty());
        assert!(session.popup().is_none());
        assert!(matches!(
            session.expansion_zoom_for(id),
            Err(ClusterError::InvalidClusterId { .. })
        ));
        assert!(session
            .open_popup(&MarkerKey::Cluster(id), MARKER, CONTAINER, POPUP)
            .is_err());
    }

    #[test]
    fn test_hover_close_drops_popup() {
        let mut session = loaded_session();
        let key = MarkerKey::from(&session.update_viewport(&BoundingBox::world(), 2)[0]);
        let t0 = Instant::now();

        session.handle_hover(HoverEvent::MarkerEnter(key.clone()), t0);
        session.open_popup(&key, MARKER, CONTAINER, POPUP).unwrap();
        assert_eq!(session.active_marker(), Some(&key));
        assert!(session.pinned_marker().is_none());

        session.handle_hover(HoverEvent::MarkerLeave(key.clone()), t0);
        assert!(session.popup().is_some());
        assert_eq!(session.poll(t0 + Duration::from_millis(300)), HoverOutcome::Closed);
        assert!(session.popup().is_none());
        assert!(session.active_marker().is_none());
    }

    #[test]
    fn test_pinned_popup_survives_pointer_leaving() {
        let mut session = loaded_session();
        let key = MarkerKey::from(&session.update_viewport(&BoundingBox::world(), 2)[0]);
        let t0 = Instant::now();

        session.handle_hover(HoverEvent::MarkerClick(key.clone()), t0);
        session.open_popup(&key, MARKER, CONTAINER, POPUP).unwrap();
        session.handle_hover(HoverEvent::MarkerLeave(key.clone()), t0);

        assert_eq!(session.poll(t0 + Duration::from_secs(5)), HoverOutcome::Unchanged);
        assert_eq!(session.pinned_marker(), Some(&key));
        assert!(session.popup().is_some());

        session.handle_hover(HoverEvent::PopupCloseClicked, t0 + Duration::from_secs(6));
        assert!(session.popup().is_none());
    }

    #[test]
    fn test_rejected_records_reported_on_load() {
        let mut session = RenderSession::new(SessionConfig::default());
        let rejected = session.load(
            vec![listing("ok", 10.0, 10.0), listing("bad", 10.0, 500.0)],
            |_| true,
        );
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].id, "bad");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_from_partial_json() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"page_size": 5, "cluster": {"radius": 60.0}}"#).unwrap();
        assert_eq!(config.page_size, 5);
        assert_eq!(config.cluster.radius, 60.0);
        assert_eq!(config.cluster.max_zoom, 18);
        assert_eq!(config.hover_close_delay_ms, 300);
    }
}
