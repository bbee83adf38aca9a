//! Orphaned product image sweep.
//!
//! # Usage
//!
//! ```bash
//! reve-cli assets sweep --dry-run        # report only
//! reve-cli assets sweep                  # remove orphans older than an hour
//! reve-cli assets sweep --grace-secs 0   # remove every orphan
//! ```

use std::time::Duration;

use reve_essence_catalog::SweepOptions;
use reve_essence_catalog::assets::DEFAULT_SWEEP_GRACE;

use super::{CommandError, connect_synchronizer};

/// Default `--grace-secs`.
pub const DEFAULT_GRACE_SECS: u64 = DEFAULT_SWEEP_GRACE.as_secs();

/// Remove stored product images that no product references.
///
/// # Errors
///
/// Returns an error if the catalog or the bucket cannot be read.
pub async fn sweep(dry_run: bool, grace_secs: u64) -> Result<(), CommandError> {
    let (synchronizer, _session) = connect_synchronizer().await?;

    let products = synchronizer.products().await?;
    let referenced = products
        .iter()
        .flat_map(|listing| listing.product.image_paths.iter());

    let report = synchronizer
        .assets()
        .sweep_orphans(
            referenced,
            SweepOptions {
                dry_run,
                grace: Duration::from_secs(grace_secs),
            },
        )
        .await?;

    #[allow(clippy::print_stdout)]
    {
        let verb = if dry_run { "would remove" } else { "removed" };
        for key in &report.orphaned {
            if !report.failed.contains(key) {
                println!("{verb} {key}");
            }
        }
        for key in &report.failed {
            println!("failed to remove {key}");
        }
        println!(
            "scanned {}, orphaned {}, skipped {} recent, failed {}",
            report.scanned,
            report.orphaned.len(),
            report.recent,
            report.failed.len()
        );
    }
    Ok(())
}
