use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoType {
    FreeToKeep,
    FreeWeekend,
    Unknown,
}

/// One free-game promotion scraped from the listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionRecord {
    #[serde(rename = "appid")]
    pub app_id: String,
    pub name: String,
    pub promo_type: PromoType,
    pub store_url: String,
    pub steamdb_url: String,
    #[serde(rename = "capsule")]
    pub capsule_image_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromotionSnapshot {
    pub items: Vec<PromotionRecord>,
    pub upcoming: Vec<String>,
}
