/// Circular FIFO buffer that grows instead of rejecting pushes.
///
/// `head` points at the oldest element, `len` elements follow it (wrapping).
/// When full, the storage doubles and the elements are laid out again
/// starting at index 0.
#[derive(Debug)]
pub(crate) struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            head: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, item: T) {
        if self.len == self.capacity() {
            self.grow();
        }
        let tail = (self.head + self.len) % self.capacity();
        self.slots[tail] = Some(item);
        self.len += 1;
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        item
    }

    fn grow(&mut self) {
        let capacity = self.capacity() * 2;
        let mut slots = Vec::with_capacity(capacity);
        while let Some(item) = self.pop() {
            slots.push(Some(item));
        }
        self.len = slots.len();
        slots.resize_with(capacity, || None);
        self.slots = slots;
        self.head = 0;
    }
}
