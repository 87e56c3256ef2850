use core::{
    cell::UnsafeCell,
    hint, ptr,
    sync::atomic::{fence, AtomicBool, AtomicU32, Ordering},
};

/// Single writer sequence lock, readers spin until they observe a consistent copy.
///
/// An odd version means a write is in progress.
pub struct ReadSpinLock<T> {
    write_lock: AtomicBool,
    version: AtomicU32,
    data: UnsafeCell<T>,
}

impl<T: Default> Default for ReadSpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> ReadSpinLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            write_lock: AtomicBool::new(false),
            version: AtomicU32::new(0),
            data: UnsafeCell::new(data),
        }
    }
}

impl<T: Copy> ReadSpinLock<T> {
    /// Fails if another writer holds the lock.
    pub fn write(&self, data: T) -> Result<(), T> {
        let (acquire, relaxed) = (Ordering::Acquire, Ordering::Relaxed);
        if self.write_lock.compare_exchange(false, true, acquire, relaxed).is_err() {
            return Err(data);
        }
        self.version.fetch_add(1, Ordering::Relaxed);
        fence(Ordering::Release);
        unsafe { ptr::write_volatile(self.data.get(), data) };
        self.version.fetch_add(1, Ordering::Release);
        self.write_lock.store(false, Ordering::Release);
        Ok(())
    }

    pub fn read(&self) -> T {
        loop {
            let version = self.version.load(Ordering::Acquire);
            if version & 1 == 1 {
                hint::spin_loop();
                continue;
            }
            let data = unsafe { ptr::read_volatile(self.data.get()) };
            fence(Ordering::Acquire);
            if version == self.version.load(Ordering::Relaxed) {
                return data;
            }
        }
    }
}

unsafe impl<T: Send> Sync for ReadSpinLock<T> {}
unsafe impl<T: Send> Send for ReadSpinLock<T> {}

mod test {
    #[test]
    fn test_read_after_write() {
        use super::ReadSpinLock;

        let lock = ReadSpinLock::new((1, 2, 3));
        assert_eq!(lock.read(), (1, 2, 3));
        assert_eq!(lock.write((4, 5, 6)), Ok(()));
        assert_eq!(lock.read(), (4, 5, 6));
    }

    #[test]
    fn test_no_torn_read() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use std::thread;

        use super::ReadSpinLock;

        let lock = Arc::new(ReadSpinLock::new([0u64; 3]));
        let done = Arc::new(AtomicBool::new(false));
        let writer = {
            let (lock, done) = (lock.clone(), done.clone());
            thread::spawn(move || {
                for i in 1..100_000u64 {
                    lock.write([i, i, i]).ok();
                }
                done.store(true, Ordering::Release);
            })
        };
        let readers: Vec<_> = (0..2)
            .map(|_| {
                let (lock, done) = (lock.clone(), done.clone());
                thread::spawn(move || {
                    while !done.load(Ordering::Acquire) {
                        let [a, b, c] = lock.read();
                        assert!(a == b && b == c, "torn read {} {} {}", a, b, c);
                    }
                })
            })
            .collect();
        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
