//! Half-open interval algebra used to turn availability into slots.
//!
//! An [`IntervalSet`] is kept sorted, disjoint and coalesced: touching
//! intervals (`[9,12)` and `[12,13)`) merge into one.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval<T> {
    pub start: T,
    pub end: T,
}

impl<T: Ord + Copy> Interval<T> {
    /// `None` for empty or inverted bounds.
    pub fn new(start: T, end: T) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn overlaps(&self, other: &Interval<T>) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Interval<T>) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersect(&self, other: &Interval<T>) -> Option<Self> {
        Self::new(self.start.max(other.start), self.end.min(other.end))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalSet<T> {
    intervals: Vec<Interval<T>>,
}

impl<T> Default for IntervalSet<T> {
    fn default() -> Self {
        Self { intervals: Vec::new() }
    }
}

impl<T: Ord + Copy> IntervalSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_intervals<I>(intervals: I) -> Self
    where
        I: IntoIterator<Item = Interval<T>>,
    {
        let mut raw: Vec<Interval<T>> = intervals.into_iter().collect();
        raw.sort_by(|a, b| a.start.cmp(&b.start));

        let mut merged: Vec<Interval<T>> = Vec::with_capacity(raw.len());
        for next in raw {
            match merged.last_mut() {
                Some(last) if next.start <= last.end => {
                    last.end = last.end.max(next.end);
                }
                _ => merged.push(next),
            }
        }

        Self { intervals: merged }
    }

    pub fn union(&mut self, other: Interval<T>) {
        let mut all = std::mem::take(&mut self.intervals);
        all.push(other);
        *self = Self::from_intervals(all);
    }

    pub fn subtract(&mut self, cut: Interval<T>) {
        let mut kept = Vec::with_capacity(self.intervals.len() + 1);
        for interval in self.intervals.drain(..) {
            if !interval.overlaps(&cut) {
                kept.push(interval);
                continue;
            }
            if let Some(left) = Interval::new(interval.start, cut.start) {
                kept.push(left);
            }
            if let Some(right) = Interval::new(cut.end, interval.end) {
                kept.push(right);
            }
        }
        self.intervals = kept;
    }

    /// Drop everything outside `bounds`.
    pub fn clip(&mut self, bounds: Interval<T>) {
        self.intervals = self
            .intervals
            .iter()
            .filter_map(|i| i.intersect(&bounds))
            .collect();
    }

    /// True when a single member interval fully contains `interval`.
    pub fn covers(&self, interval: &Interval<T>) -> bool {
        self.intervals.iter().any(|i| i.contains(interval))
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval<T>> {
        self.intervals.iter()
    }

    pub fn as_slice(&self) -> &[Interval<T>] {
        &self.intervals
    }
}
