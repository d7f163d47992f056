//! The lane-bucketed view of the board.

use crate::record::{Lane, Record, RecordId};
use serde::{Deserialize, Serialize};

/// Records bucketed by lane.
///
/// Serializes as `{"0": [...], "1": [...], "2": [...]}` and always carries all
/// three keys. Lanes 0 and 1 are ascending by scheduled date; lane 2 is the
/// same ordering reversed so the most recently finished work comes first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedView {
    #[serde(rename = "0", default)]
    todo: Vec<Record>,
    #[serde(rename = "1", default)]
    doing: Vec<Record>,
    #[serde(rename = "2", default)]
    done: Vec<Record>,
}

impl GroupedView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket `records` by lane, applying the board ordering rule.
    pub fn from_records(mut records: Vec<Record>) -> Self {
        records.sort_by(|a, b| {
            a.scheduled_date
                .cmp(&b.scheduled_date)
                .then(a.id.cmp(&b.id))
        });

        let mut view = Self::default();
        for record in records {
            view.lane_mut(record.lane).push(record);
        }
        view.done.reverse();
        view
    }

    pub fn lane(&self, lane: Lane) -> &[Record] {
        match lane {
            Lane::Todo => &self.todo,
            Lane::Doing => &self.doing,
            Lane::Done => &self.done,
        }
    }

    pub fn lane_mut(&mut self, lane: Lane) -> &mut Vec<Record> {
        match lane {
            Lane::Todo => &mut self.todo,
            Lane::Doing => &mut self.doing,
            Lane::Done => &mut self.done,
        }
    }

    /// Every record paired with the lane bucket holding it, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (Lane, &Record)> {
        Lane::ALL
            .into_iter()
            .flat_map(move |lane| self.lane(lane).iter().map(move |r| (lane, r)))
    }

    pub fn len(&self) -> usize {
        self.todo.len() + self.doing.len() + self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Locate a record by id.
    pub fn find(&self, id: RecordId) -> Option<(Lane, usize)> {
        Lane::ALL.into_iter().find_map(|lane| {
            self.lane(lane)
                .iter()
                .position(|r| r.id == id)
                .map(|pos| (lane, pos))
        })
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.find(id).map(|(lane, pos)| &self.lane(lane)[pos])
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.find(id).is_some()
    }

    /// Insert at the head of the record's lane.
    pub fn prepend(&mut self, record: Record) {
        self.lane_mut(record.lane).insert(0, record);
    }

    /// Remove every record with `id` from all lanes. Returns the first one found.
    pub fn remove(&mut self, id: RecordId) -> Option<Record> {
        let mut removed = None;
        for lane in Lane::ALL {
            let bucket = self.lane_mut(lane);
            while let Some(pos) = bucket.iter().position(|r| r.id == id) {
                let record = bucket.remove(pos);
                removed.get_or_insert(record);
            }
        }
        removed
    }

    /// Replace every record matching `id` with `record`, in place, across all
    /// lanes. Returns whether anything matched.
    pub fn replace(&mut self, id: RecordId, record: &Record) -> bool {
        let mut replaced = false;
        for lane in Lane::ALL {
            for slot in self.lane_mut(lane).iter_mut().filter(|r| r.id == id) {
                *slot = record.clone();
                replaced = true;
            }
        }
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn record(id: i64, lane: Lane, day: u32) -> Record {
        Record {
            id: RecordId(id),
            category: None,
            title: Some(format!("task {}", id)),
            notes: None,
            lane,
            scheduled_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        }
    }

    #[test]
    fn test_empty_view_has_all_keys() {
        let value = serde_json::to_value(GroupedView::new()).unwrap();
        assert_eq!(value, json!({ "0": [], "1": [], "2": [] }));
    }

    #[test]
    fn test_missing_keys_deserialize_as_empty() {
        let view: GroupedView = serde_json::from_value(json!({ "1": [] })).unwrap();
        assert!(view.is_empty());
    }

    #[test]
    fn test_done_lane_is_reversed() {
        let view = GroupedView::from_records(vec![
            record(1, Lane::Done, 3),
            record(2, Lane::Todo, 5),
            record(3, Lane::Done, 1),
            record(4, Lane::Todo, 2),
            record(5, Lane::Done, 2),
        ]);

        let todo: Vec<i64> = view.lane(Lane::Todo).iter().map(|r| r.id.0).collect();
        let done: Vec<i64> = view.lane(Lane::Done).iter().map(|r| r.id.0).collect();
        assert_eq!(todo, vec![4, 2]);
        assert_eq!(done, vec![1, 5, 3]);
        assert!(view.lane(Lane::Doing).is_empty());
    }

    #[test]
    fn test_remove_and_prepend() {
        let mut view = GroupedView::from_records(vec![
            record(1, Lane::Todo, 1),
            record(2, Lane::Todo, 2),
        ]);

        let mut moved = view.remove(RecordId(2)).unwrap();
        moved.lane = Lane::Done;
        view.prepend(moved);

        assert_eq!(view.find(RecordId(2)), Some((Lane::Done, 0)));
        assert_eq!(view.lane(Lane::Todo).len(), 1);
        assert!(view.remove(RecordId(99)).is_none());
    }

    #[test]
    fn test_replace_in_place_keeps_position() {
        let mut view = GroupedView::from_records(vec![
            record(1, Lane::Doing, 1),
            record(2, Lane::Doing, 2),
            record(3, Lane::Doing, 3),
        ]);
        let mut edited = record(2, Lane::Doing, 2);
        edited.title = Some("edited".to_string());

        assert!(view.replace(RecordId(2), &edited));
        assert_eq!(view.find(RecordId(2)), Some((Lane::Doing, 1)));
        assert_eq!(view.get(RecordId(2)).unwrap().title.as_deref(), Some("edited"));
        assert!(!view.replace(RecordId(42), &edited));
    }
}
