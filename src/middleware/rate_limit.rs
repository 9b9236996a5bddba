use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    middleware::Next,
};

/// Prunes idle per-IP limiter state from the request path, every `every`
/// requests, so the keyed store stays bounded without a background task.
pub struct LimiterSweep {
    every: u64,
    seen: AtomicU64,
    sweep: Box<dyn Fn() + Send + Sync>,
}

impl LimiterSweep {
    pub fn new(every: u64, sweep: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            every: every.max(1),
            seen: AtomicU64::new(0),
            sweep: Box::new(sweep),
        }
    }

    /// Count one request; returns true when it triggered a sweep.
    pub fn tick(&self) -> bool {
        let n = self.seen.fetch_add(1, Ordering::Relaxed) + 1;
        if n % self.every == 0 {
            (self.sweep)();
            true
        } else {
            false
        }
    }
}

pub async fn sweep_middleware(
    State(sweep): State<Arc<LimiterSweep>>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    sweep.tick();
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use std::sync::atomic::AtomicUsize;
    use tower::ServiceExt;

    fn counting(every: u64) -> (Arc<LimiterSweep>, Arc<AtomicUsize>) {
        let sweeps = Arc::new(AtomicUsize::new(0));
        let counter = sweeps.clone();
        let sweep = LimiterSweep::new(every, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (Arc::new(sweep), sweeps)
    }

    #[test]
    fn sweeps_every_nth_request() {
        let (sweep, sweeps) = counting(3);

        let fired: Vec<bool> = (0..7).map(|_| sweep.tick()).collect();
        assert_eq!(fired, [false, false, true, false, false, true, false]);
        assert_eq!(sweeps.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn zero_interval_sweeps_every_request() {
        let (sweep, sweeps) = counting(0);
        assert!(sweep.tick());
        assert!(sweep.tick());
        assert_eq!(sweeps.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn middleware_counts_requests() {
        let (sweep, sweeps) = counting(2);
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(sweep, sweep_middleware));

        for _ in 0..4 {
            let response = app
                .clone()
                .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert!(response.status().is_success());
        }

        assert_eq!(sweeps.load(Ordering::SeqCst), 2);
    }
}
