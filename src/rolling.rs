/// Fixed-capacity FIFO of the `N` most recent values.
///
/// The buffer is always full: it starts from `N` seed values and every push
/// evicts the oldest slot.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingBuffer<const N: usize> {
    slots: [f64; N],
    // index of the oldest slot, which the next push overwrites
    head: usize,
}

impl<const N: usize> RollingBuffer<N> {
    pub fn filled(value: f64) -> Self {
        Self::from_array([value; N])
    }

    /// Seeds the buffer with `values`, oldest first.
    pub fn from_array(values: [f64; N]) -> Self {
        assert!(N > 0, "RollingBuffer needs at least one slot");
        Self { slots: values, head: 0 }
    }

    /// Appends `value` and returns the evicted oldest value.
    pub fn push(&mut self, value: f64) -> f64 {
        let evicted = std::mem::replace(&mut self.slots[self.head], value);
        self.head = (self.head + 1) % N;
        evicted
    }

    pub fn mean(&self) -> f64 {
        self.slots.iter().sum::<f64>() / N as f64
    }

    pub fn newest(&self) -> f64 {
        self.slots[(self.head + N - 1) % N]
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Iterates from the oldest to the newest value.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..N).map(move |i| self.slots[(self.head + i) % N])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_eviction() {
        let mut buf = RollingBuffer::<4>::from_array([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buf.push(5.0), 1.0);
        assert_eq!(buf.push(6.0), 2.0);
        assert_eq!(buf.iter().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buf.newest(), 6.0);
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn test_mean_tracks_window() {
        let mut buf = RollingBuffer::<8>::filled(1.0);
        assert_eq!(buf.mean(), 1.0);
        for _ in 0..8 {
            buf.push(3.0);
        }
        assert_eq!(buf.mean(), 3.0);
        buf.push(11.0);
        assert_eq!(buf.mean(), 4.0);
    }

    #[test]
    fn test_wraps_many_times() {
        let mut buf = RollingBuffer::<3>::filled(0.0);
        for i in 0..100 {
            buf.push(i as f64);
        }
        assert_eq!(buf.iter().collect::<Vec<_>>(), vec![97.0, 98.0, 99.0]);
    }
}
