//! Process-local unique 64-bit id generator.
//!
//! Ids seed autokeys and the initial commit value of freshly created
//! records, so two records with identical payloads stay distinguishable.
//!
//! Bit layout (most to least significant):
//! ```text
//! [wallclock seconds: 32] [process magic: 8] [thread id: 8] [counter: 16]
//! ```
//!
//! The fast path is lock-free: the counter lives in a thread-local cell
//! and thread ids are handed out once per thread from a global atomic.
//! Ids are monotonic per thread as long as a thread requests fewer than
//! 2^16 ids per wall-clock second.

use std::cell::Cell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

static PROCESS_MAGIC: OnceLock<u8> = OnceLock::new();
static NEXT_THREAD_ID: AtomicU8 = AtomicU8::new(0);

thread_local! {
    static THREAD_ID: Cell<Option<u8>> = const { Cell::new(None) };
    static COUNTER: Cell<u16> = const { Cell::new(0) };
}

fn wallclock_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn process_magic() -> u8 {
    *PROCESS_MAGIC.get_or_init(|| {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or_default();
        (nanos ^ (std::process::id() << 3)) as u8
    })
}

fn thread_id() -> u8 {
    THREAD_ID.with(|cell| match cell.get() {
        Some(id) => id,
        None => {
            let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
            cell.set(Some(id));
            id
        }
    })
}

/// Generate the next process-locally unique id.
pub fn next() -> u64 {
    let counter = COUNTER.with(|cell| {
        let v = cell.get();
        cell.set(v.wrapping_add(1));
        v
    });

    (wallclock_secs() << 32)
        | (u64::from(process_magic()) << 24)
        | (u64::from(thread_id()) << 16)
        | u64::from(counter)
}
