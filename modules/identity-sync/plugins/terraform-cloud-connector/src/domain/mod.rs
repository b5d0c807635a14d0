//! Resource builders: one per upstream kind, plus the helpers they share.

pub mod agent_tokens;
pub mod organizations;
pub mod projects;
pub mod resource_types;
pub mod teams;
pub mod users;
pub mod workspaces;

use std::future::Future;

use identity_sync_sdk::{ConnectorError, Page, PageToken};
use tokio_util::sync::CancellationToken;

use crate::client::{ClientError, Paginated};

/// Run one upstream call unless `cancel` fires first.
///
/// A failed call is reported as `terraform-cloud: failed to {operation}`.
pub(crate) async fn guarded<T>(
    cancel: &CancellationToken,
    operation: &str,
    call: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ConnectorError> {
    if cancel.is_cancelled() {
        return Err(ConnectorError::Cancelled);
    }
    match cancel.run_until_cancelled(call).await {
        Some(result) => result.map_err(|source| {
            ConnectorError::upstream(format!("terraform-cloud: failed to {operation}"), source)
        }),
        None => Err(ConnectorError::Cancelled),
    }
}

/// Project one upstream page into a builder page.
///
/// An empty upstream page ends the chain regardless of its pagination meta.
pub(crate) fn page_from<T, U, I>(paged: Paginated<T>, project: impl FnMut(T) -> I) -> Page<U>
where
    I: IntoIterator<Item = U>,
{
    if paged.items.is_empty() {
        return Page::empty();
    }
    let next = PageToken::next(paged.current_page, paged.total_pages);
    Page::new(paged.items.into_iter().flat_map(project).collect(), next)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn empty_upstream_page_has_no_next_token() {
        let page: Page<u32> = page_from(
            Paginated {
                items: Vec::<u32>::new(),
                current_page: 1,
                total_pages: 4,
            },
            Some,
        );
        assert!(page.items.is_empty());
        assert!(!page.has_next());
    }

    #[test]
    fn next_token_follows_upstream_current_page() {
        let page = page_from(
            Paginated {
                items: vec![1, 2],
                current_page: 2,
                total_pages: 3,
            },
            |n| Some(n * 10),
        );
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.next_page_token.as_str(), "3");
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_call() {
        let polled = AtomicBool::new(false);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = guarded(&cancel, "list teams", async {
            polled.store(true, Ordering::SeqCst);
            Ok::<_, ClientError>(())
        })
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancelling_an_in_flight_call_abandons_it() {
        let started = AtomicBool::new(false);
        let finished = AtomicBool::new(false);
        let cancel = CancellationToken::new();

        let (result, ()) = tokio::join!(
            guarded(&cancel, "read team", async {
                started.store(true, Ordering::SeqCst);
                std::future::pending::<()>().await;
                finished.store(true, Ordering::SeqCst);
                Ok::<_, ClientError>(())
            }),
            async {
                while !started.load(Ordering::SeqCst) {
                    tokio::task::yield_now().await;
                }
                cancel.cancel();
            }
        );

        assert!(result.unwrap_err().is_cancelled());
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn upstream_errors_carry_the_operation() {
        let err = guarded(&CancellationToken::new(), "list teams", async {
            Err::<(), _>(ClientError::NotFound("GET teams".to_owned()))
        })
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "terraform-cloud: failed to list teams: not found: GET teams"
        );
    }
}
