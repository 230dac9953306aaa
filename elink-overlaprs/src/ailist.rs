use std::ops::Range;

use num_traits::{PrimInt, Unsigned};

use super::Overlapper;
use elink_core::models::Interval;

/// How many of the following intervals an interval must contain before it is
/// moved out of the current sublist.
const MIN_COVERAGE: usize = 10;

/// Augmented Interval List (Feng, Ratan & Sheffield, Bioinformatics 2019).
///
/// Intervals are sorted by start and split into sublists so that long
/// intervals covering many short ones do not defeat the running `max_end`
/// pruning. Every sublist keeps a running maximum of ends; a query walks
/// each sublist backwards from the last start below the query end and stops
/// as soon as the running maximum falls behind the query start.
///
/// ```
/// use elink_overlaprs::{AIList, Overlapper, Interval};
///
/// let peaks = vec![
///     Interval { start: 1000u32, end: 2000, val: 0usize },
///     Interval { start: 1500, end: 2500, val: 1 },
///     Interval { start: 5000, end: 6000, val: 2 },
/// ];
///
/// let index = AIList::build(peaks);
/// let mut hits = index.find_vals(1800, 2200);
/// hits.sort();
/// assert_eq!(hits, vec![0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct AIList<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    starts: Vec<I>,
    ends: Vec<I>,
    max_ends: Vec<I>,
    sublists: Vec<Range<usize>>,
    stored_intervals: Vec<Interval<I, T>>,
}

impl<I, T> Overlapper<I, T> for AIList<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    fn build(intervals: Vec<Interval<I, T>>) -> Self
    where
        Self: Sized,
    {
        let mut remaining = intervals;
        remaining.sort_by_key(|iv| iv.start);

        let mut list = AIList {
            starts: Vec::with_capacity(remaining.len()),
            ends: Vec::with_capacity(remaining.len()),
            max_ends: Vec::with_capacity(remaining.len()),
            sublists: Vec::new(),
            stored_intervals: Vec::with_capacity(remaining.len()),
        };

        while !remaining.is_empty() {
            let from = list.starts.len();
            remaining = list.take_sublist(remaining);
            list.sublists.push(from..list.starts.len());
        }

        list
    }

    fn find_iter<'a>(
        &'a self,
        start: I,
        end: I,
    ) -> Box<dyn Iterator<Item = &'a Interval<I, T>> + 'a> {
        Box::new(IterFind {
            inner: self,
            sublist: 0,
            cursor: None,
            start,
            end,
        })
    }
}

impl<I, T> AIList<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    /// Append one sublist built from `intervals` (sorted by start) and return
    /// the intervals that cover too many successors to stay in it.
    fn take_sublist(&mut self, intervals: Vec<Interval<I, T>>) -> Vec<Interval<I, T>> {
        let mut deferred = Vec::new();
        let mut running_max = I::zero();

        for (index, interval) in intervals.iter().enumerate() {
            let covered = intervals
                .iter()
                .skip(index + 1)
                .take(MIN_COVERAGE * 2 - 1)
                .filter(|next| interval.end > next.end)
                .count();

            if covered >= MIN_COVERAGE {
                deferred.push(interval.clone());
            } else {
                running_max = running_max.max(interval.end);
                self.starts.push(interval.start);
                self.ends.push(interval.end);
                self.max_ends.push(running_max);
                self.stored_intervals.push(interval.clone());
            }
        }

        // the last interval has no successors, so every sublist keeps at least one
        deferred
    }

    /// Returns the number of intervals in the list.
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    /// Returns `true` if the list holds no intervals.
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Lazy overlap query over an [`AIList`], created by [`Overlapper::find_iter`].
#[derive(Debug)]
pub struct IterFind<'a, I, T>
where
    T: Eq + Clone + Send + Sync + 'a,
    I: PrimInt + Unsigned + Send + Sync,
{
    inner: &'a AIList<I, T>,
    sublist: usize,
    cursor: Option<usize>,
    start: I,
    end: I,
}

impl<'a, I, T> Iterator for IterFind<'a, I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync + 'a,
{
    type Item = &'a Interval<I, T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(range) = self.inner.sublists.get(self.sublist) {
            let starts = &self.inner.starts[range.clone()];
            let ends = &self.inner.ends[range.clone()];
            let max_ends = &self.inner.max_ends[range.clone()];
            let stored = &self.inner.stored_intervals[range.clone()];

            let end = self.end;
            let i = self
                .cursor
                .get_or_insert_with(|| starts.partition_point(|&s| s < end));

            while *i > 0 {
                *i -= 1;
                if self.start < ends[*i] {
                    return Some(&stored[*i]);
                }
                if self.start >= max_ends[*i] {
                    // nothing further left in this sublist can reach the query
                    break;
                }
            }

            self.cursor = None;
            self.sublist += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    fn iv(start: u32, end: u32, val: usize) -> Interval<u32, usize> {
        Interval { start, end, val }
    }

    #[fixture]
    fn intervals() -> Vec<Interval<u32, usize>> {
        vec![iv(1, 5, 0), iv(3, 7, 1), iv(6, 10, 2), iv(8, 12, 3)]
    }

    fn vals(hits: Vec<&Interval<u32, usize>>) -> Vec<usize> {
        let mut v: Vec<usize> = hits.into_iter().map(|i| i.val).collect();
        v.sort();
        v
    }

    #[rstest]
    fn test_build_and_len(intervals: Vec<Interval<u32, usize>>) {
        let ailist = AIList::build(intervals.clone());
        assert_eq!(ailist.len(), intervals.len());
        assert!(!ailist.is_empty());
    }

    #[rstest]
    #[case(2, 4, vec![0, 1])]
    #[case(9, 11, vec![2, 3])]
    #[case(13, 15, vec![])]
    #[case(0, 1, vec![])]
    #[case(5, 6, vec![1])]
    fn test_find_iter(
        intervals: Vec<Interval<u32, usize>>,
        #[case] start: u32,
        #[case] end: u32,
        #[case] expected: Vec<usize>,
    ) {
        let ailist = AIList::build(intervals);
        assert_eq!(vals(ailist.find_iter(start, end).collect()), expected);
        assert_eq!(ailist.find_vals(start, end).len(), expected.len());
    }

    #[rstest]
    fn test_empty() {
        let ailist: AIList<u32, usize> = AIList::build(vec![]);
        assert!(ailist.is_empty());
        assert!(ailist.find_vals(1, 2).is_empty());
    }

    #[rstest]
    fn test_long_intervals_are_decomposed() {
        let mut intervals = vec![iv(0, 30, 100), iv(25, 100, 101)];
        for k in 0..40u32 {
            intervals.push(iv(k * 2, k * 2 + 1, k as usize));
        }
        let ailist = AIList::build(intervals.clone());
        assert!(ailist.sublists.len() >= 2);

        // agree with a linear scan on a spread of queries
        for (s, e) in [(6, 8), (30, 35), (0, 200), (101, 150), (29, 30)] {
            let mut expected: Vec<usize> = intervals
                .iter()
                .filter(|i| i.overlap(s, e))
                .map(|i| i.val)
                .collect();
            expected.sort();
            assert_eq!(vals(ailist.find_iter(s, e).collect()), expected, "query {s}-{e}");
        }
    }
}
