use {std::collections::VecDeque, uapi::OwnedFd};

/// File descriptors received through the side channel that have not yet been claimed by
/// a message.
#[derive(Default)]
pub struct FdQueue {
    fds: VecDeque<OwnedFd>,
}

impl FdQueue {
    pub fn push(&mut self, fd: OwnedFd) {
        self.fds.push_back(fd);
    }

    pub fn pop(&mut self) -> Option<OwnedFd> {
        self.fds.pop_front()
    }

    pub fn len(&self) -> usize {
        self.fds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fds.is_empty()
    }
}

impl Extend<OwnedFd> for FdQueue {
    fn extend<T: IntoIterator<Item = OwnedFd>>(&mut self, iter: T) {
        self.fds.extend(iter);
    }
}
