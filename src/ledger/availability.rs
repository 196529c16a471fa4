use crate::model::*;

use super::ResourceState;

/// Free gaps of `resource` inside `window`.
pub fn free_slots(resource: &ResourceState, window: &Interval) -> Vec<Interval> {
    let booked: Vec<Interval> = resource
        .bookings
        .query_overlaps(window)
        .into_iter()
        .map(|(i, _)| i)
        .collect();
    // Tree output is already in start order.
    let merged = merge_overlapping(&booked);
    subtract_intervals(&[*window], &merged)
}

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[Interval]) -> Vec<Interval> {
    let mut merged: Vec<Interval> = Vec::new();
    for &interval in sorted {
        if let Some(last) = merged.last_mut()
            && interval.start <= last.end {
                last.end = last.end.max(interval.end);
                continue;
            }
        merged.push(interval);
    }
    merged
}

/// `base` minus `to_remove`. Both inputs must be sorted by start and
/// `to_remove` must be disjoint.
pub fn subtract_intervals(base: &[Interval], to_remove: &[Interval]) -> Vec<Interval> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;
        let current_end = b.end;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < current_end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(Interval::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < current_end {
            result.push(Interval::new(current_start, current_end));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval_tree::IntervalTree;

    fn iv(start: Secs, end: Secs) -> Interval {
        Interval::new(start, end)
    }

    fn room_with(bookings: &[(Secs, Secs)]) -> ResourceState {
        let mut rs = ResourceState::new("R101".into(), 0, ResourceAttrs::Room);
        let mut tree = IntervalTree::new();
        for &(s, e) in bookings {
            tree.insert(iv(s, e), "alice".to_string());
        }
        rs.bookings = tree;
        rs
    }

    #[test]
    fn merge_joins_overlapping_and_adjacent() {
        let merged = merge_overlapping(&[iv(0, 10), iv(5, 15), iv(15, 20), iv(30, 40)]);
        assert_eq!(merged, vec![iv(0, 20), iv(30, 40)]);
    }

    #[test]
    fn merge_keeps_contained() {
        let merged = merge_overlapping(&[iv(0, 100), iv(10, 20), iv(30, 40)]);
        assert_eq!(merged, vec![iv(0, 100)]);
    }

    #[test]
    fn subtract_middle() {
        let free = subtract_intervals(&[iv(0, 100)], &[iv(20, 30), iv(50, 60)]);
        assert_eq!(free, vec![iv(0, 20), iv(30, 50), iv(60, 100)]);
    }

    #[test]
    fn subtract_everything() {
        let free = subtract_intervals(&[iv(10, 20)], &[iv(0, 100)]);
        assert!(free.is_empty());
    }

    #[test]
    fn subtract_nothing() {
        let free = subtract_intervals(&[iv(10, 20)], &[]);
        assert_eq!(free, vec![iv(10, 20)]);
    }

    #[test]
    fn free_slots_inside_opening_hours() {
        let h = HOUR;
        let rs = room_with(&[(9 * h, 10 * h), (10 * h, 11 * h), (14 * h, 15 * h)]);
        let free = free_slots(&rs, &iv(8 * h, 18 * h));
        assert_eq!(
            free,
            vec![iv(8 * h, 9 * h), iv(11 * h, 14 * h), iv(15 * h, 18 * h)]
        );
    }

    #[test]
    fn free_slots_clip_bookings_outside_window() {
        let rs = room_with(&[(0, 50), (90, 200)]);
        assert_eq!(free_slots(&rs, &iv(40, 100)), vec![iv(50, 90)]);
    }

    #[test]
    fn free_slots_empty_resource() {
        let rs = room_with(&[]);
        assert_eq!(free_slots(&rs, &iv(0, 10)), vec![iv(0, 10)]);
    }
}
