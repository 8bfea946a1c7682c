// Feedback loop storage for the frost mask: two equally sized masks, one written this
// frame ("current"), one written last frame ("previous"). Swapping flips an index;
// buffer contents are never copied and the masks are never reallocated.

use crate::types::Mask;

pub struct AccumulationBufferPair {
    buffers: [Mask; 2],
    current: usize,
}

impl AccumulationBufferPair {
    pub fn new(width: usize, height: usize) -> Self {
        Self { buffers: [Mask::new(width, height), Mask::new(width, height)], current: 0 }
    }

    pub fn previous(&self) -> &Mask {
        &self.buffers[1 - self.current]
    }

    /// Write access to "current" alongside read access to "previous".
    pub fn split_mut(&mut self) -> (&mut Mask, &Mask) {
        let [a, b] = &mut self.buffers;
        if self.current == 0 { (a, &*b) } else { (b, &*a) }
    }

    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }
}
