//! services/partition_service.rs
//! Reparte una lista ordenada de destinos en porciones contiguas entre N cuentas.

use crate::models::platform_model::{CampaignError, CampaignResult};

/// Las cuentas `0..n-2` reciben `len / n` destinos consecutivos; la última
/// recibe el resto. Puede haber porciones vacías si hay menos destinos que cuentas.
pub fn partition<T: Clone>(targets: &[T], n_accounts: usize) -> CampaignResult<Vec<Vec<T>>> {
    if n_accounts == 0 {
        return Err(CampaignError::InvalidInput(
            "n_accounts debe ser >= 1".to_string(),
        ));
    }

    let share = targets.len() / n_accounts;
    let mut slices = Vec::with_capacity(n_accounts);
    for idx in 0..n_accounts {
        let start = idx * share;
        let end = if idx + 1 < n_accounts {
            start + share
        } else {
            targets.len()
        };
        slices.push(targets[start..end].to_vec());
    }
    Ok(slices)
}
