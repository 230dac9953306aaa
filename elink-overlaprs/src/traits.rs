use num_traits::{PrimInt, Unsigned};

pub use elink_core::models::Interval;

///
/// A static index over half-open `[start, end)` ranges carrying a payload.
/// It is built once and then only queried, possibly from many threads.
///
pub trait Overlapper<I, T>: Send + Sync
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    fn build(intervals: Vec<Interval<I, T>>) -> Self
    where
        Self: Sized;

    /// Stored intervals sharing a position with `[start, end)`.
    fn find_iter<'a>(&'a self, start: I, end: I) -> Box<dyn Iterator<Item = &'a Interval<I, T>> + 'a>;

    /// Payloads of the stored intervals hit by `[start, end)`.
    fn find_vals(&self, start: I, end: I) -> Vec<T> {
        self.find_iter(start, end).map(|iv| iv.val.clone()).collect()
    }
}
