// Response pool: reusable key/value maps for JSON responses
//
// Handlers borrow a map, fill it, serialize it and drop the guard; the map
// is cleared and parked for the next request. Cleared maps keep their
// allocation but no values from the previous request.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

pub type ResponseMap = HashMap<&'static str, Value>;

/// Shared pool of response maps. Clone freely (it's an Arc inside).
#[derive(Clone)]
pub struct ResponsePool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    idle: Mutex<Vec<ResponseMap>>,
    /// Maps beyond this many idle ones are dropped instead of parked
    max_idle: usize,
}

impl ResponsePool {
    pub fn new(max_idle: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(Vec::with_capacity(max_idle)),
                max_idle,
            }),
        }
    }

    /// Take an empty map, reusing an idle one when available.
    pub fn get(&self) -> PooledMap {
        let map = self.inner.idle.lock().pop().unwrap_or_default();
        PooledMap {
            map,
            pool: Arc::clone(&self.inner),
        }
    }

    /// Number of maps currently parked.
    pub fn idle_count(&self) -> usize {
        self.inner.idle.lock().len()
    }
}

/// A map on loan from a [`ResponsePool`]; returned on drop.
pub struct PooledMap {
    map: ResponseMap,
    pool: Arc<PoolInner>,
}

impl Deref for PooledMap {
    type Target = ResponseMap;

    fn deref(&self) -> &Self::Target {
        &self.map
    }
}

impl DerefMut for PooledMap {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.map
    }
}

impl Drop for PooledMap {
    fn drop(&mut self) {
        let mut map = std::mem::take(&mut self.map);
        map.clear();

        let mut idle = self.pool.idle.lock();
        if idle.len() < self.pool.max_idle {
            idle.push(map);
        }
    }
}
