//! `github-issuer delete` command.

use crate::context::ServiceContext;
use crate::model::ResourceKey;

/// Execute the `delete` command.
///
/// Records still holding finalizers are only marked; the controller closes
/// their issue and releases them on its next pass.
///
/// # Errors
///
/// Returns an error string if the record does not exist or cannot be written.
pub async fn run(ctx: &ServiceContext, key: &ResourceKey) -> Result<(), String> {
    ctx.store.delete(key).await.map_err(|e| e.to_string())?;
    match ctx.store.get(key).await.map_err(|e| e.to_string())? {
        Some(record) => println!(
            "githubissuer {key} marked for deletion; waiting on finalizers: {}",
            record.metadata.finalizers.join(", ")
        ),
        None => println!("githubissuer {key} deleted"),
    }
    Ok(())
}
