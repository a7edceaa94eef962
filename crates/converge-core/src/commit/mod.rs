mod allocator;

pub use allocator::CommitIdAllocator;
