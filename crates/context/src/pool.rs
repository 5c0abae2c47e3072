//! Reuse of [`Context`]s across requests.

use crate::Context;
use crate::writer::ResponseTransport;
use bytes::Bytes;
use http::Request;
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use tracing::trace;

/// Idle contexts kept by default.
pub const DEFAULT_MAX_IDLE: usize = 1024;

/// A bounded stack of idle contexts.
///
/// Contexts are only handed out through [`checkout`](Self::checkout), which resets them,
/// so nothing of a previous request is ever visible to the next one. Released contexts
/// drop their request, scratch values and transport before going idle.
#[derive(Debug)]
pub struct ContextPool {
    idle: Mutex<Vec<Box<Context>>>,
    max_idle: usize,
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE)
    }
}

impl ContextPool {
    pub fn new(max_idle: usize) -> Self {
        Self { idle: Mutex::new(Vec::new()), max_idle }
    }

    /// Takes an idle context, or allocates one, and resets it for `request`
    pub fn checkout(&self, request: Request<Bytes>, transport: Box<dyn ResponseTransport>) -> PooledContext<'_> {
        let pooled = self.idle.lock().pop();
        let mut ctx = pooled.unwrap_or_else(|| {
            trace!("context pool is empty, allocating");
            Box::default()
        });
        ctx.reset(request, transport);
        PooledContext { pool: self, ctx: Some(ctx) }
    }

    /// Number of contexts waiting for a request
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn max_idle(&self) -> usize {
        self.max_idle
    }

    fn release(&self, mut ctx: Box<Context>) {
        ctx.recycle();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(ctx);
        }
    }
}

/// A checked out context, returned to its pool when dropped
#[derive(Debug)]
pub struct PooledContext<'pool> {
    pool: &'pool ContextPool,
    ctx: Option<Box<Context>>,
}

impl Deref for PooledContext<'_> {
    type Target = Context;

    fn deref(&self) -> &Self::Target {
        self.ctx.as_deref().expect("pooled context is present until dropped")
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx.as_deref_mut().expect("pooled context is present until dropped")
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.release(ctx);
        }
    }
}
