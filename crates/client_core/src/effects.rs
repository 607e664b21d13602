//! Delivery-URL rendering of effect directives for the hosted image provider.

use anyhow::{Context, Result};
use reqwest::Client;
use shared::domain::NamedTransform;
use tracing::info;
use url::Url;

pub const DEFAULT_DELIVERY_HOST: &str = "https://res.cloudinary.com";

#[derive(Debug, Clone, PartialEq)]
pub struct EffectRequest {
    pub delivery_host: String,
    pub cloud_name: String,
    pub public_id: String,
    pub directives: Vec<NamedTransform>,
}

impl EffectRequest {
    pub fn new(
        cloud_name: impl Into<String>,
        public_id: impl Into<String>,
        directives: Vec<NamedTransform>,
    ) -> Self {
        Self {
            delivery_host: DEFAULT_DELIVERY_HOST.to_string(),
            cloud_name: cloud_name.into(),
            public_id: public_id.into(),
            directives,
        }
    }

    /// `effect:parameter` strings in composition order.
    pub fn effect_strings(&self) -> Vec<String> {
        self.directives
            .iter()
            .map(|d| format!("{}:{}", d.key, d.value))
            .collect()
    }

    /// One chained transformation component per directive, each centered and fill-cropped.
    pub fn delivery_url(&self) -> Result<Url> {
        let mut url = format!(
            "{}/{}/image/upload",
            self.delivery_host.trim_end_matches('/'),
            self.cloud_name
        );
        for effect in self.effect_strings() {
            url.push_str(&format!("/e_{effect},g_center,c_fill"));
        }
        url.push('/');
        url.push_str(&self.public_id);
        Url::parse(&url).with_context(|| format!("invalid delivery url: {url}"))
    }
}

pub async fn fetch_rendered(http: &Client, request: &EffectRequest) -> Result<Vec<u8>> {
    let url = request.delivery_url()?;
    info!(%url, directives = request.directives.len(), "effects: fetching rendered image");
    let bytes = http
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("failed to reach {url}"))?
        .error_for_status()?
        .bytes()
        .await?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
#[path = "tests/effects_tests.rs"]
mod tests;
