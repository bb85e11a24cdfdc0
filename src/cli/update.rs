//! `debrepo update`: rebuild distributions in the foreground.

use anyhow::{Result, bail};

use crate::log;
use crate::update::{UpdateCoordinator, UpdateError, UpdateOutcome};
use crate::utils::plural::plural_count;

/// Rebuild `dists` (every configured distribution when empty).
///
/// Fails if any rebuild failed or any name is unknown.
pub fn run_update(coordinator: &UpdateCoordinator, dists: &[String]) -> Result<()> {
    let results: Vec<(String, Result<UpdateOutcome, UpdateError>)> = if dists.is_empty() {
        coordinator.request_all()
    } else {
        dists
            .iter()
            .map(|dist| (dist.clone(), coordinator.request_update(dist)))
            .collect()
    };

    let failed: Vec<&str> = results
        .iter()
        .filter_map(|(dist, result)| match result {
            Err(UpdateError::UnknownDistribution(_)) => {
                log!("error"; "unknown distribution `{}`", dist);
                Some(dist.as_str())
            }
            // Already logged by the coordinator.
            Err(UpdateError::Rebuild { .. }) => Some(dist.as_str()),
            Ok(_) => None,
        })
        .collect();

    if !failed.is_empty() {
        bail!(
            "{} failed: {}",
            plural_count(failed.len(), "distribution"),
            failed.join(", ")
        );
    }

    log!("update"; "{} up to date", plural_count(results.len(), "distribution"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn coordinator() -> UpdateCoordinator {
        let rebuild = |dist: &str| -> anyhow::Result<()> {
            if dist == "broken" {
                anyhow::bail!("reindex exited with 1");
            }
            Ok(())
        };
        UpdateCoordinator::new(["jammy", "noble", "broken"], 2, Arc::new(rebuild))
    }

    #[test]
    fn test_named_dists_succeed() {
        let coordinator = coordinator();
        let dists = vec!["jammy".to_string(), "noble".to_string()];
        assert!(run_update(&coordinator, &dists).is_ok());
    }

    #[test]
    fn test_failure_is_reported() {
        let coordinator = coordinator();
        let err = run_update(&coordinator, &[]).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_unknown_dist_is_error() {
        let coordinator = coordinator();
        let err = run_update(&coordinator, &["sid".to_string()]).unwrap_err();
        assert!(err.to_string().contains("sid"));
    }
}
