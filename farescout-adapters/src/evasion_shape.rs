//! Applies an evasion rung to a request shape.

use farescout_fetch::{
    AdapterContext, Deadline, EvasionStrategy, FetchError, ProxyLease, RequestShape,
};

/// Attaches proxy routing to a shape when the rung calls for it.
///
/// The returned lease guard must stay alive for the duration of the
/// request; dropping it frees the proxy slot.
pub(crate) async fn apply(
    shape: RequestShape,
    ctx: &AdapterContext,
    evasion: EvasionStrategy,
    deadline: Deadline,
) -> Result<(RequestShape, Option<ProxyLease>), FetchError> {
    if !evasion.needs_proxy() {
        return Ok((shape, None));
    }
    let lease = ctx.proxy.lease(deadline).await?;
    let shaped = shape.with_proxy(lease.url());
    Ok((shaped, Some(lease)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use farescout_fetch::ImpersonateProfile;
    use std::time::Duration;

    #[tokio::test]
    async fn test_no_proxy_for_plain_rungs() {
        let ctx = AdapterContext::minimal();
        let deadline = Deadline::after(Duration::from_secs(1));
        let (shape, guard) = apply(
            RequestShape::plain(),
            &ctx,
            EvasionStrategy::Impersonate(ImpersonateProfile::Chrome126),
            deadline,
        )
        .await
        .unwrap();
        assert!(shape.proxy.is_none());
        assert!(guard.is_none());
    }

    #[tokio::test]
    async fn test_proxy_rung_without_pool_fails() {
        let ctx = AdapterContext::minimal();
        let deadline = Deadline::after(Duration::from_millis(20));
        let result = apply(
            RequestShape::plain(),
            &ctx,
            EvasionStrategy::ImpersonateProxy(ImpersonateProfile::Chrome126),
            deadline,
        )
        .await;
        assert!(result.is_err());
    }
}
