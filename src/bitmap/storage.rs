//! Backing memory shared by a bitmap and its clipped views.
#![allow(unsafe_code)]

use alloc::{boxed::Box, vec::Vec};
use bytemuck::Pod;
use core::{
    ptr::NonNull,
    sync::atomic::{AtomicBool, AtomicU8, Ordering},
};

/// A heap buffer that is only ever accessed through `AtomicU8` views after construction.
struct OwnedBuffer<T> {
    raw: NonNull<[T]>,
}

// SAFETY: the buffer is uniquely owned and its contents are only accessed atomically.
unsafe impl<T: Send> Send for OwnedBuffer<T> {}
// SAFETY: see above.
unsafe impl<T: Send> Sync for OwnedBuffer<T> {}

impl<T> Drop for OwnedBuffer<T> {
    fn drop(&mut self) {
        // SAFETY: `raw` came from `Box::leak` and is dropped exactly once.
        drop(unsafe { Box::from_raw(self.raw.as_ptr()) });
    }
}

enum Owner {
    Buffer(#[allow(dead_code)] Box<dyn Send + Sync>),
    External(Option<Box<dyn FnOnce() + Send>>),
}

/// Pixel memory, either an owned buffer or caller memory with a release callback.
pub(crate) struct Storage {
    ptr: NonNull<AtomicU8>,
    len: usize,
    owner: Owner,
    disposed: AtomicBool,
}

// SAFETY: the memory is only accessed through atomics and the release callback only runs in
// `Drop`, which has exclusive access.
unsafe impl Send for Storage {}
// SAFETY: see above.
unsafe impl Sync for Storage {}

impl Storage {
    /// Take ownership of a caller buffer of plain old data.
    pub(crate) fn from_vec<T: Pod + Send>(buffer: Vec<T>) -> Self {
        let raw = NonNull::from(Box::leak(buffer.into_boxed_slice()));
        let len = raw.len() * size_of::<T>();
        Self {
            ptr: raw.cast::<AtomicU8>(),
            len,
            owner: Owner::Buffer(Box::new(OwnedBuffer { raw })),
            disposed: AtomicBool::new(false),
        }
    }

    /// Wrap caller memory, running `release` exactly once when the storage is dropped.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` bytes until `release` is called and must
    /// not be accessed non-atomically by anything else during that time.
    pub(crate) unsafe fn from_raw_parts(
        ptr: NonNull<u8>,
        len: usize,
        release: Box<dyn FnOnce() + Send>,
    ) -> Self {
        Self {
            ptr: ptr.cast::<AtomicU8>(),
            len,
            owner: Owner::External(Some(release)),
            disposed: AtomicBool::new(false),
        }
    }

    /// The backing bytes.
    #[inline]
    pub(crate) fn bytes(&self) -> &[AtomicU8] {
        // SAFETY: `ptr` is valid for `len` bytes while `self` is alive and `AtomicU8` has the
        // size and alignment of `u8`.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// The length of the backing memory in bytes.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Record that the owner released the memory explicitly.
    pub(crate) fn mark_disposed(&self) {
        self.disposed.store(true, Ordering::Relaxed);
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        if let Owner::External(release) = &mut self.owner {
            if !self.disposed.load(Ordering::Relaxed) {
                log::warn!(
                    "external bitmap memory of {} bytes was released without being disposed",
                    self.len
                );
            }
            if let Some(release) = release.take() {
                release();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use core::sync::atomic::AtomicUsize;

    #[test]
    fn owned_buffer_bytes() {
        let storage = Storage::from_vec(alloc::vec![0x0102_0304u32, 0x0506_0708]);
        assert_eq!(storage.len(), 8);
        let bytes: Vec<u8> = storage.bytes().iter().map(|b| b.load(Ordering::Relaxed)).collect();
        assert_eq!(bytes, [4, 3, 2, 1, 8, 7, 6, 5]);
    }

    #[test]
    fn release_runs_once() {
        let mut memory = alloc::vec![0u8; 16];
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let ptr = NonNull::new(memory.as_mut_ptr()).unwrap();
        // SAFETY: `memory` outlives the storage and is not touched while it is alive.
        let storage = unsafe {
            Storage::from_raw_parts(
                ptr,
                memory.len(),
                Box::new(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                }),
            )
        };
        storage.bytes()[3].store(9, Ordering::Relaxed);
        storage.mark_disposed();
        drop(storage);
        assert_eq!(released.load(Ordering::Relaxed), 1);
        assert_eq!(memory[3], 9);
    }
}
