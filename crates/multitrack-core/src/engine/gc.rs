//! RT-safe garbage collection for the published track set
//!
//! The mixer iterates a `basedrop::SharedCell<Vec<Shared<Track>>>` snapshot.
//! When the registry republishes the set (load, unload, clear), the audio
//! thread may still hold the previous snapshot; dropping it there must not
//! free memory or join a track's fill thread. `Shared<T>` defers the final
//! drop to the collector running here instead.
//!
//! ```ignore
//! use basedrop::Shared;
//! use crate::engine::gc::gc_handle;
//!
//! let tracks = Shared::new(&gc_handle(), Vec::new());
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// Global handle for creating Shared<T> allocations.
/// The Collector itself lives on a dedicated GC thread.
static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

/// How often retired snapshots are reclaimed
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("audio-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it is created on the thread that runs it
            let mut collector = Collector::new();
            tx.send(collector.handle()).expect("Failed to send GC handle");

            log::info!("Audio GC thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        })
        .expect("Failed to spawn audio GC thread");

    rx.recv().expect("Failed to receive GC handle")
}

/// Get a handle for creating Shared<T> allocations
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use basedrop::{Shared, SharedCell};

    #[test]
    fn test_shared_cell_replace() {
        let handle = gc_handle();
        let cell = SharedCell::new(Shared::new(&handle, vec![1, 2, 3]));
        let old = cell.get();
        cell.set(Shared::new(&handle, vec![4]));
        assert_eq!(old.len(), 3);
        assert_eq!(cell.get().len(), 1);
    }
}
