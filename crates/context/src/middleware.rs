//! Built-in middleware.
//!
//! Register them first so they wrap everything else:
//!
//! ```
//! use micro_context::Engine;
//! use micro_context::middleware::{logger, recovery};
//!
//! let engine = Engine::builder().with_middleware(logger()).with_middleware(recovery()).build().unwrap();
//! # drop(engine);
//! ```

use crate::error::ErrorType;
use crate::handler::Handler;
use crate::Context;
use http::StatusCode;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;
use tracing::{error, info};

/// Logs one line per request once the rest of the chain has run
pub fn logger() -> impl Handler {
    |ctx: &mut Context| {
        let start = Instant::now();
        ctx.next();
        let latency = start.elapsed();

        info!(
            method = %ctx.method(),
            path = ctx.uri().path(),
            status = ctx.writer().status().as_u16(),
            latency = ?latency,
            client_ip = ctx.client_ip().unwrap_or("-"),
            errors = ctx.errors().len(),
            last_error = ctx.last_error(),
            "request handled"
        );
    }
}

/// Turns a panic in the rest of the chain into `500 Internal Server Error`.
///
/// The panic message is recorded as an [`ErrorType::Internal`] entry. Whatever the panicking
/// handler left in the scratch store stays there.
pub fn recovery() -> impl Handler {
    |ctx: &mut Context| {
        let result = catch_unwind(AssertUnwindSafe(|| ctx.next()));
        if let Err(payload) = result {
            let cause = panic_message(payload.as_ref());
            error!(cause, uri = %ctx.uri(), "handler panicked, recovered");
            ctx.error_typed(format!("panic: {cause}"), ErrorType::Internal, ());
            ctx.abort_with_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
