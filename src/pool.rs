//! Contains a thread-safe pool of halftoning scratch space.

use crate::{GrayBuffer, HalftoneError, Halftoner, DEFAULT_WIDTH_LIMIT};
use log::trace;
#[cfg(feature = "threads")]
use rayon::prelude::*;
use std::{
    num::NonZeroUsize,
    ops::{Deref, DerefMut},
    sync::{Mutex, MutexGuard, PoisonError},
};

/// A thread-safe pool of scratch space for halftoning.
///
/// Each call to [`ScratchPool::checkout`] hands out a [`Halftoner`] that has exclusive use
/// of its scratch space until the returned guard is dropped,
/// so images halftoned on different threads never share error rows.
///
/// # Examples
/// ```
/// # use halftone::{GrayBuffer, ScratchPool, HalftoneError};
/// # fn main() -> Result<(), HalftoneError> {
/// let pool = ScratchPool::default();
///
/// std::thread::scope(|s| {
///     for gray in [40, 90, 140, 190] {
///         let pool = &pool;
///         s.spawn(move || -> Result<(), HalftoneError> {
///             let mut pixels = vec![gray; 64 * 64];
///             pool.halftone(GrayBuffer::new(&mut pixels, 64, 64)?)?;
///             assert!(pixels.iter().all(|&p| p == 0 || p == 255));
///             Ok(())
///         });
///     }
/// });
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ScratchPool {
    /// Scratch buffers that are not checked out.
    idle: Mutex<Vec<Vec<i32>>>,
    /// The width limit given to each checked out [`Halftoner`].
    width_limit: u32,
    /// The maximum number of idle buffers to keep.
    max_idle: usize,
}

impl ScratchPool {
    /// Creates a new, empty [`ScratchPool`].
    ///
    /// Every [`Halftoner`] checked out from the pool rejects images with a width
    /// at or above `width_limit`, and at most `max_idle` buffers are kept between checkouts.
    #[must_use]
    pub fn new(width_limit: u32, max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(max_idle)),
            width_limit,
            max_idle,
        }
    }

    /// Gets the width limit for this [`ScratchPool`].
    #[must_use]
    pub const fn width_limit(&self) -> u32 {
        self.width_limit
    }

    /// Gets the maximum number of idle buffers kept by this [`ScratchPool`].
    #[must_use]
    pub const fn max_idle(&self) -> usize {
        self.max_idle
    }

    /// Returns the number of buffers currently waiting in the pool.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    /// Locks the idle list.
    ///
    /// A poisoned lock is still usable, since every buffer is reseeded on checkout.
    fn lock(&self) -> MutexGuard<'_, Vec<Vec<i32>>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Checks out a [`Halftoner`] with exclusive use of a scratch buffer.
    ///
    /// The buffer returns to the pool when the guard is dropped.
    #[must_use]
    pub fn checkout(&self) -> ScratchGuard<'_> {
        let scratch = self.lock().pop();
        if scratch.is_none() {
            trace!("halftone scratch pool empty, starting a new buffer");
        }
        ScratchGuard {
            pool: self,
            halftoner: Halftoner::from_scratch(scratch.unwrap_or_default(), self.width_limit),
        }
    }

    /// Returns a scratch buffer to the pool, dropping it if the pool is full.
    fn release(&self, scratch: Vec<i32>) {
        if scratch.is_empty() {
            return;
        }

        let mut idle = self.lock();
        if idle.len() < self.max_idle {
            idle.push(scratch);
        } else {
            trace!("halftone scratch pool full, dropping a buffer");
        }
    }

    /// Halftones the given image in place using pooled scratch space.
    ///
    /// # Errors
    /// Returns an error, without modifying the image,
    /// if the image width is at or above [`ScratchPool::width_limit`].
    pub fn halftone(&self, image: GrayBuffer) -> Result<(), HalftoneError> {
        self.checkout().halftone(image)
    }

    /// Checks every image against the width limit.
    #[cfg(feature = "threads")]
    fn check_widths(&self, images: &[GrayBuffer]) -> Result<(), HalftoneError> {
        match images.iter().find(|image| image.width() >= self.width_limit) {
            Some(image) => Err(HalftoneError::WidthLimit {
                width: image.width(),
                limit: self.width_limit,
            }),
            None => Ok(()),
        }
    }

    /// Halftones each of the given images in place, in parallel.
    ///
    /// Each image is processed start to finish by a single thread;
    /// only separate images run concurrently.
    ///
    /// # Errors
    /// Returns an error, without modifying any image,
    /// if any image width is at or above [`ScratchPool::width_limit`].
    #[cfg(feature = "threads")]
    pub fn halftone_batch_par(&self, images: &mut [GrayBuffer]) -> Result<(), HalftoneError> {
        self.check_widths(images)?;

        images
            .par_iter_mut()
            .try_for_each_init(|| self.checkout(), |guard, image| guard.halftone(image.reborrow()))
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        let threads = std::thread::available_parallelism().map_or(4, NonZeroUsize::get);
        Self::new(DEFAULT_WIDTH_LIMIT, threads)
    }
}

/// A [`Halftoner`] checked out from a [`ScratchPool`].
///
/// The scratch space returns to the pool when this is dropped.
#[derive(Debug)]
pub struct ScratchGuard<'a> {
    /// The pool to return the scratch space to.
    pool: &'a ScratchPool,
    /// The halftoner holding the checked out scratch space.
    halftoner: Halftoner,
}

impl Deref for ScratchGuard<'_> {
    type Target = Halftoner;

    fn deref(&self) -> &Self::Target {
        &self.halftoner
    }
}

impl DerefMut for ScratchGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.halftoner
    }
}

impl Drop for ScratchGuard<'_> {
    fn drop(&mut self) {
        self.pool.release(self.halftoner.take_scratch());
    }
}
