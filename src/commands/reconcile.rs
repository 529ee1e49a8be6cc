//! `github-issuer reconcile` command.

use crate::context::ServiceContext;
use crate::controller::Reconciler;
use crate::model::ResourceKey;

/// Execute the `reconcile` command: one pass for one record.
///
/// # Errors
///
/// Returns the pass failure as a string.
pub async fn run(ctx: &ServiceContext, key: &ResourceKey) -> Result<(), String> {
    let outcome =
        Reconciler::from_context(ctx).reconcile(key).await.map_err(|e| format!("{key}: {e}"))?;
    println!("{key}: {outcome}");
    Ok(())
}
