use std::collections::VecDeque;

/// Fixed-capacity FIFO buffer that evicts the oldest entry on overflow.
///
/// Overflow silently drops the oldest entry; every telemetry path funnels
/// through one of these so a chatty page cannot grow memory without bound.
/// Capacity is fixed at construction and never grows.
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Up to the last `n` items in insertion order. Does not mutate.
    pub fn tail(&self, n: usize) -> Vec<T>
    where
        T: Clone,
    {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_last_capacity_items() {
        let mut buf = RingBuffer::new(3);
        for i in 0..8 {
            buf.push(i);
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.tail(10), vec![5, 6, 7]);
    }

    #[test]
    fn tail_preserves_insertion_order() {
        let mut buf = RingBuffer::new(5);
        for i in 0..5 {
            buf.push(i);
        }
        assert_eq!(buf.tail(2), vec![3, 4]);
        // reading the tail must not consume entries
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn capacity_never_grows() {
        let mut buf = RingBuffer::new(2);
        for i in 0..100 {
            buf.push(i);
        }
        assert_eq!(buf.capacity(), 2);
        assert_eq!(buf.tail(2), vec![98, 99]);
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let mut buf = RingBuffer::new(0);
        buf.push("a");
        buf.push("b");
        assert_eq!(buf.tail(5), vec!["b"]);
    }
}
