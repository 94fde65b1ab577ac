use serde::{Deserialize, Serialize};

use crate::types::{ModelInfo, ProviderConfig};

/// One row of the flattened model listing across all enabled providers.
///
/// `full_id` is globally unique: `providerId/modelId`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedModel {
    /// Vendor model identifier.
    pub id: String,

    /// Human-readable model name.
    pub name: String,

    /// Context window size in tokens.
    pub context_window: u64,

    /// Owning provider's id.
    pub provider_id: String,

    /// Owning provider's display name.
    pub provider_name: String,

    /// Owning provider's accent color.
    pub provider_color: String,

    /// `providerId/modelId`, unique across all enabled providers.
    pub full_id: String,
}

impl AggregatedModel {
    /// Build the listing row for one model of one provider.
    pub fn new(provider: &ProviderConfig, model: &ModelInfo) -> Self {
        Self {
            id: model.id.clone(),
            name: model.name.clone(),
            context_window: model.context_window,
            provider_id: provider.id.clone(),
            provider_name: provider.name.clone(),
            provider_color: provider.color.clone(),
            full_id: format!("{}/{}", provider.id, model.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_id_joins_provider_and_model() {
        let provider = ProviderConfig::new("Acme")
            .with_id("acme")
            .with_color("#123456")
            .with_models(vec![ModelInfo::new("small", "Small", 8192)]);
        let entry = AggregatedModel::new(&provider, &provider.models[0]);
        assert_eq!(entry.full_id, "acme/small");
        assert_eq!(entry.provider_name, "Acme");
        assert_eq!(entry.provider_color, "#123456");
    }
}
