use crate::Context;
use std::fmt;
use std::sync::Arc;

/// Longest chain a [`Context`] can walk, global middleware included.
pub const MAX_HANDLERS: usize = 63;

/// A link of the handler chain.
///
/// A handler continues the chain by calling [`Context::next`]; code placed after that
/// call runs once the rest of the chain has returned.
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &mut Context);
}

impl<F> Handler for F
where
    F: Fn(&mut Context) + Send + Sync,
{
    #[inline]
    fn handle(&self, ctx: &mut Context) {
        (self)(ctx)
    }
}

/// Makes a [`Handler`] from a closure or `fn(&mut Context)`.
///
/// Mostly useful to pin down the closure signature for type inference.
pub fn handler_fn<F>(f: F) -> F
where
    F: Fn(&mut Context) + Send + Sync,
{
    f
}

/// The resolved, immutable, ordered sequence of handlers for one route.
///
/// Cloning is cheap, the chain is shared between the router and every context walking it.
#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Arc<[Arc<dyn Handler>]>,
}

impl HandlerChain {
    /// # Panics
    ///
    /// Panics when more than [`MAX_HANDLERS`] handlers are given.
    pub fn new(handlers: Vec<Arc<dyn Handler>>) -> Self {
        assert!(
            handlers.len() <= MAX_HANDLERS,
            "too many handlers: {} exceeds the limit {}",
            handlers.len(),
            MAX_HANDLERS
        );
        Self { handlers: handlers.into() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the chain `self ++ other`
    pub fn combine(&self, other: &[Arc<dyn Handler>]) -> Self {
        Self::new(self.handlers.iter().chain(other.iter()).cloned().collect())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<Arc<dyn Handler>> {
        self.handlers.get(index).cloned()
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain").field("len", &self.handlers.len()).finish()
    }
}

impl FromIterator<Arc<dyn Handler>> for HandlerChain {
    fn from_iter<T: IntoIterator<Item = Arc<dyn Handler>>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_ctx: &mut Context) {}

    fn assert_is_handler<H: Handler>(_handler: &H) {
        // no op
    }

    #[test]
    fn fn_and_closure_are_handlers() {
        assert_is_handler(&noop);
        assert_is_handler(&handler_fn(|ctx| ctx.set("k", 1_u8)));
    }

    #[test]
    fn combine_appends() {
        let global = HandlerChain::new(vec![Arc::new(noop) as Arc<dyn Handler>]);
        let route = vec![Arc::new(noop) as Arc<dyn Handler>, Arc::new(noop) as Arc<dyn Handler>];

        let chain = global.combine(&route);
        assert_eq!(chain.len(), 3);
        assert_eq!(global.len(), 1);
    }

    #[test]
    #[should_panic(expected = "too many handlers")]
    fn chain_length_is_bounded() {
        let handlers: Vec<Arc<dyn Handler>> = (0..=MAX_HANDLERS).map(|_| Arc::new(noop) as Arc<dyn Handler>).collect();
        let _ = HandlerChain::new(handlers);
    }
}
