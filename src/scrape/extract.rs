use super::document::{self, Document};
use super::types::{PromoType, PromotionRecord, PromotionSnapshot};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use std::collections::HashMap;
use url::Url;

const APP_PATH_MARKER: &str = "/app/";
const ROW_TAGS: [&str; 3] = ["tr", "li", "div"];
const STORE_APP_URL: &str = "https://store.steampowered.com/app";
const CAPSULE_CDN_URL: &str = "https://cdn.cloudflare.steamstatic.com/steam/apps";

static APP_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/app/([0-9]+)").unwrap());
static UPCOMING_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)potentially\s+upcoming\s+free\s+promotions").unwrap());

pub fn app_id_from_href(href: &str) -> Option<&str> {
    APP_ID
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// `row_text` is expected lowercased.
pub fn is_free_row(row_text: &str) -> bool {
    row_text.contains("free")
}

/// `row_text` is expected lowercased.
pub fn classify_promo(row_text: &str) -> PromoType {
    if row_text.contains("free to keep") {
        PromoType::FreeToKeep
    } else if row_text.contains("free weekend") || row_text.contains("play for free") {
        PromoType::FreeWeekend
    } else {
        PromoType::Unknown
    }
}

pub fn display_name(link_text: &str, app_id: &str) -> String {
    let trimmed = link_text.trim();
    if trimmed.is_empty() {
        format!("App {}", app_id)
    } else {
        trimmed.to_string()
    }
}

pub fn store_url(app_id: &str) -> String {
    format!("{}/{}", STORE_APP_URL, app_id)
}

pub fn capsule_url(app_id: &str) -> String {
    format!("{}/{}/capsule_616x353.jpg", CAPSULE_CDN_URL, app_id)
}

pub fn steamdb_url(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(String::from)
}

pub fn is_upcoming_heading(title: &str) -> bool {
    UPCOMING_HEADING.is_match(title.trim())
}

/// Scrapes promotions and the upcoming list out of the listing page.
///
/// Never fails: anchors that cannot be turned into a record are dropped, and
/// a page without the expected structure yields an empty snapshot.
pub fn extract_promotions(markup: &str, base: &Url) -> PromotionSnapshot {
    let doc = Document::parse(markup);

    let found: Vec<PromotionRecord> = doc
        .anchors_with_href_containing(APP_PATH_MARKER)
        .filter_map(|anchor| promotion_from_anchor(anchor, base))
        .collect();

    let items = dedup_by_app_id(found);
    let upcoming = upcoming_promotions(&doc);

    tracing::debug!(
        "Extracted {} promotions and {} upcoming entries",
        items.len(),
        upcoming.len()
    );

    PromotionSnapshot { items, upcoming }
}

fn promotion_from_anchor(anchor: ElementRef<'_>, base: &Url) -> Option<PromotionRecord> {
    let href = document::attr(anchor, "href")?;
    let app_id = app_id_from_href(href)?;

    let row_text = document::closest(anchor, &ROW_TAGS)
        .map(document::text_content)
        .unwrap_or_default()
        .to_lowercase();
    if !is_free_row(&row_text) {
        return None;
    }

    let steamdb_url = match steamdb_url(base, href) {
        Some(url) => url,
        None => {
            tracing::warn!("Skipping app {}: unresolvable href {:?}", app_id, href);
            return None;
        }
    };

    Some(PromotionRecord {
        app_id: app_id.to_string(),
        name: display_name(&document::text_content(anchor), app_id),
        promo_type: classify_promo(&row_text),
        store_url: store_url(app_id),
        steamdb_url,
        capsule_image_url: capsule_url(app_id),
    })
}

/// Collapses records sharing an app id. Ids keep the position of their first
/// occurrence; fields come from the last one.
pub fn dedup_by_app_id(records: Vec<PromotionRecord>) -> Vec<PromotionRecord> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<PromotionRecord> = Vec::with_capacity(records.len());

    for record in records {
        match positions.get(&record.app_id) {
            Some(&idx) => unique[idx] = record,
            None => {
                positions.insert(record.app_id.clone(), unique.len());
                unique.push(record);
            }
        }
    }

    unique
}

fn upcoming_promotions(doc: &Document) -> Vec<String> {
    let mut upcoming = Vec::new();

    for heading in doc.headings() {
        if !is_upcoming_heading(&document::text_content(heading)) {
            continue;
        }
        let Some(list) = document::next_sibling_named(heading, "ul") else {
            continue;
        };
        upcoming.extend(
            document::descendants_named(list, "li")
                .map(|li| document::text_content(li).trim().to_string())
                .filter(|text| !text.is_empty()),
        );
    }

    upcoming
}
