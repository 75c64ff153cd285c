//! Per-request correlation context.
//!
//! The dispatcher opens a task-local scope for every request. Code running inside
//! that scope (guards, handlers, telemetry) reads the request id and the resolved
//! user without threading them through parameters. Spawned tasks do not inherit the
//! scope; take a [`current`] snapshot and re-enter it with [`with_context`].

use std::cell::RefCell;
use std::future::Future;

use tastelog_core::ReportContext;
use uuid::Uuid;

/// Request id reported outside of any request scope.
pub const UNSET_REQUEST_ID: &str = "unset";

tokio::task_local! {
    static CONTEXT: RefCell<RequestContext>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub user_id: Option<String>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            user_id: None,
        }
    }
}

pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Runs `fut` with `ctx` as the ambient context. The scope ends when `fut` completes.
pub async fn with_context<F>(ctx: RequestContext, fut: F) -> F::Output
where
    F: Future,
{
    CONTEXT.scope(RefCell::new(ctx), fut).await
}

pub fn current() -> Option<RequestContext> {
    CONTEXT.try_with(|ctx| ctx.borrow().clone()).ok()
}

pub fn current_request_id() -> String {
    CONTEXT
        .try_with(|ctx| ctx.borrow().request_id.clone())
        .unwrap_or_else(|_| UNSET_REQUEST_ID.to_string())
}

pub fn current_user_id() -> Option<String> {
    CONTEXT
        .try_with(|ctx| ctx.borrow().user_id.clone())
        .ok()
        .flatten()
}

/// Records the authenticated user for the rest of the current request.
///
/// Returns `false` when called outside a request scope.
pub fn set_user(user_id: &str) -> bool {
    let in_scope = CONTEXT
        .try_with(|ctx| ctx.borrow_mut().user_id = Some(user_id.to_string()))
        .is_ok();

    if in_scope {
        tracing::Span::current().record("user_id", user_id);
    }
    in_scope
}

/// Correlation data for an error report.
pub fn report_context() -> ReportContext {
    ReportContext::new(current_request_id(), current_user_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_outside_scope_returns_sentinel() {
        assert_eq!(current_request_id(), UNSET_REQUEST_ID);
        assert_eq!(current_user_id(), None);
        assert!(current().is_none());
        assert!(!set_user("user-1"));
    }

    #[tokio::test]
    async fn test_scope_exposes_values() {
        let seen = with_context(RequestContext::new("req-1"), async {
            set_user("user-1");
            (current_request_id(), current_user_id())
        })
        .await;

        assert_eq!(seen, ("req-1".to_string(), Some("user-1".to_string())));
        assert_eq!(current_request_id(), UNSET_REQUEST_ID);
    }

    #[tokio::test]
    async fn test_concurrent_scopes_are_isolated() {
        let tasks: Vec<_> = (0..50)
            .map(|i| {
                tokio::spawn(with_context(RequestContext::new(format!("req-{}", i)), async move {
                    set_user(&format!("user-{}", i));
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    (i, current_request_id(), current_user_id())
                }))
            })
            .collect();

        for task in tasks {
            let (i, request_id, user_id) = task.await.unwrap();
            assert_eq!(request_id, format!("req-{}", i));
            assert_eq!(user_id, Some(format!("user-{}", i)));
        }
    }

    #[tokio::test]
    async fn test_snapshot_propagates_to_spawned_task() {
        let id = with_context(RequestContext::new("req-parent"), async {
            let snapshot = current().unwrap();
            tokio::spawn(with_context(snapshot, async { current_request_id() }))
                .await
                .unwrap()
        })
        .await;

        assert_eq!(id, "req-parent");
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(new_request_id(), new_request_id());
    }
}
