use crate::error::{SettingsError, StoreError};
use crate::risk::RiskThresholds;
use crate::store::RecordStore;

pub const THRESHOLDS_KEY: &str = "riskSettings";

/// Resolves the configured thresholds, falling back to the defaults when
/// nothing is stored or the stored value cannot be read.
pub async fn load_thresholds<S: RecordStore>(store: &S) -> Result<RiskThresholds, StoreError> {
    let Some(value) = store.get_setting(THRESHOLDS_KEY).await? else {
        return Ok(RiskThresholds::default());
    };

    match serde_json::from_value::<RiskThresholds>(value) {
        Ok(thresholds) => Ok(thresholds),
        Err(err) => {
            tracing::warn!(%err, "stored risk thresholds are unreadable, using defaults");
            Ok(RiskThresholds::default())
        }
    }
}

pub async fn save_thresholds<S: RecordStore>(
    store: &S,
    thresholds: &RiskThresholds,
) -> Result<(), SettingsError> {
    thresholds.validate()?;
    let value = serde_json::to_value(thresholds)
        .map_err(|err| StoreError::Malformed(err.to_string()))?;
    store.put_setting(THRESHOLDS_KEY, value).await?;
    tracing::info!(?thresholds, "risk thresholds updated");
    Ok(())
}

pub async fn reset_thresholds<S: RecordStore>(store: &S) -> Result<RiskThresholds, SettingsError> {
    let defaults = RiskThresholds::default();
    save_thresholds(store, &defaults).await?;
    Ok(defaults)
}
