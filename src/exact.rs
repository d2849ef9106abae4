//! Exact-coincidence grouping.
//!
//! Listings in the same building usually share a coordinate up to GPS noise.
//! They are grouped by rounding latitude and longitude to four decimal places
//! (~11 m) so the map can show one pin with a count badge and a list-style
//! popup instead of stacking identical markers.
//!
//! Rounding goes through decimal formatting rather than multiply-and-truncate
//! so the same coordinate always yields the same key on every platform.

use std::collections::HashMap;
use std::fmt;

use crate::{GeoPoint, GeoRecord, Located};

/// Building-level grouping key: `"{lat:.4},{lng:.4}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ExactGroupKey(String);

impl ExactGroupKey {
    /// Number of fractional digits kept for each axis.
    pub const PRECISION: usize = 4;

    /// Key for a coordinate.
    ///
    /// # Example
    /// ```
    /// use spatial_grouping::{ExactGroupKey, GeoPoint};
    ///
    /// let a = ExactGroupKey::from_point(GeoPoint::new(40.40934, 49.86712));
    /// let b = ExactGroupKey::from_point(GeoPoint::new(40.409341, 49.867119));
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str(), "40.4093,49.8671");
    /// ```
    pub fn from_point(point: GeoPoint) -> Self {
        Self(format!(
            "{:.prec$},{:.prec$}",
            point.latitude,
            point.longitude,
            prec = Self::PRECISION
        ))
    }

    /// Key for anything with a location, `None` when it has no coordinate.
    pub fn of<R: Located>(record: &R) -> Option<Self> {
        record.location().map(Self::from_point)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExactGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ExactGroupKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A partition of records by [`ExactGroupKey`].
///
/// Every placed input record lands in exactly one bucket. Within a bucket
/// records keep their input order; the order of buckets is unspecified.
#[derive(Debug, Clone)]
pub struct ExactGroups<R> {
    buckets: HashMap<ExactGroupKey, Vec<R>>,
}

impl<R: Located> ExactGroups<R> {
    /// Partition `records` by exact-group key. Records without a coordinate
    /// are skipped.
    pub fn partition<I>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
    {
        let mut buckets: HashMap<ExactGroupKey, Vec<R>> = HashMap::new();
        for record in records {
            if let Some(key) = ExactGroupKey::of(&record) {
                buckets.entry(key).or_default().push(record);
            }
        }
        Self { buckets }
    }
}

impl<R> ExactGroups<R> {
    /// Members of the group, in input order.
    pub fn get(&self, key: &ExactGroupKey) -> Option<&[R]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Number of records sharing `key` (0 for an unknown key).
    pub fn size_of(&self, key: &ExactGroupKey) -> usize {
        self.buckets.get(key).map_or(0, Vec::len)
    }

    /// Number of distinct groups.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of grouped records.
    pub fn record_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ExactGroupKey, &[R])> {
        self.buckets.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

/// Group records that share a building-level coordinate.
///
/// Records without a coordinate are skipped. Coordinates are not validated
/// here; use [`crate::ClusterIndex`] to filter malformed input.
///
/// # Example
/// ```
/// use spatial_grouping::{compute_exact_groups, ExactGroupKey, GeoPoint, GeoRecord};
///
/// let records = vec![
///     GeoRecord::new("a", GeoPoint::new(40.4093, 49.8671), ()),
///     GeoRecord::new("b", GeoPoint::new(40.40931, 49.86709), ()),
///     GeoRecord::new("c", GeoPoint::new(40.4094, 49.8671), ()),
/// ];
///
/// let groups = compute_exact_groups(&records);
/// assert_eq!(groups.len(), 2);
/// let key = ExactGroupKey::from_point(GeoPoint::new(40.4093, 49.8671));
/// assert_eq!(groups.size_of(&key), 2);
/// ```
pub fn compute_exact_groups<P>(records: &[GeoRecord<P>]) -> ExactGroups<&GeoRecord<P>> {
    ExactGroups::partition(records.iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;
    use std::collections::HashSet;

    fn record(id: &str, lat: f64, lng: f64) -> GeoRecord<()> {
        GeoRecord::new(id, GeoPoint::new(lat, lng), ())
    }

    #[test]
    fn test_rounding_beyond_fourth_decimal_groups_together() {
        let records = vec![
            record("a", 40.40934, 49.86712),
            record("b", 40.409341, 49.867119),
        ];
        let groups = compute_exact_groups(&records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.record_count(), 2);
    }

    #[test]
    fn test_fourth_decimal_difference_splits() {
        let records = vec![record("a", 40.4093, 49.8671), record("b", 40.4094, 49.8671)];
        let groups = compute_exact_groups(&records);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_key_format() {
        let key = ExactGroupKey::from_point(GeoPoint::new(-33.86882, 151.20929));
        assert_eq!(key.as_str(), "-33.8688,151.2093");
        assert_eq!(key.to_string(), "-33.8688,151.2093");
    }

    #[test]
    fn test_bucket_keeps_input_order() {
        let records = vec![
            record("first", 40.4093, 49.8671),
            record("other", 10.0, 10.0),
            record("second", 40.40931, 49.86711),
            record("third", 40.40929, 49.86709),
        ];
        let groups = compute_exact_groups(&records);
        let key = ExactGroupKey::from_point(GeoPoint::new(40.4093, 49.8671));
        let ids: Vec<&str> = groups
            .get(&key)
            .unwrap()
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unplaced_records_are_skipped() {
        let records = vec![record("a", 1.0, 1.0), GeoRecord::unplaced("b", ())];
        let groups = compute_exact_groups(&records);
        assert_eq!(groups.record_count(), 1);
    }

    #[test]
    fn test_empty_input() {
        let records: Vec<GeoRecord<()>> = vec![];
        let groups = compute_exact_groups(&records);
        assert!(groups.is_empty());
        let key = ExactGroupKey::from_point(GeoPoint::new(0.0, 0.0));
        assert_eq!(groups.size_of(&key), 0);
        assert!(groups.get(&key).is_none());
    }

    quickcheck! {
        // Every record ends up in exactly one bucket, under its own key.
        fn prop_groups_partition_input(coords: Vec<(u16, u16)>) -> bool {
            // Coarse grid so collisions are common
            let records: Vec<GeoRecord<()>> = coords
                .iter()
                .enumerate()
                .map(|(i, (a, b))| {
                    record(
                        &format!("r{}", i),
                        40.0 + (*a % 50) as f64 * 0.00004,
                        49.0 + (*b % 50) as f64 * 0.00004,
                    )
                })
                .collect();

            let groups = compute_exact_groups(&records);
            let mut seen = HashSet::new();
            for (key, members) in groups.iter() {
                for member in members {
                    if ExactGroupKey::of(member).as_ref() != Some(key) {
                        return false;
                    }
                    if !seen.insert(member.id.clone()) {
                        return false;
                    }
                }
            }
            seen.len() == records.len() && groups.record_count() == records.len()
        }
    }
}
