//! Referrer normalisation and ranking.

use std::collections::HashMap;

use stats_core::models::{RefererCount, VisitEvent};
use url::Url;

/// Reduce a raw `Referer` header to `host + path`.
///
/// The host is lowercased and loses a leading `www.`; a trailing `/` on the
/// path is dropped. Returns `None` for blank input, unparseable URLs and
/// URLs without a host.
pub fn normalize_referrer(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = Url::parse(trimmed).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let path = parsed.path().trim_end_matches('/');

    Some(format!("{}{}", host, path))
}

/// Count visits by normalised referrer and keep the `limit` most frequent.
///
/// Ordered by count descending; equal counts are ordered by referrer.
pub fn top_referrers<'a, I>(visits: I, limit: usize) -> Vec<RefererCount>
where
    I: IntoIterator<Item = &'a VisitEvent>,
{
    let mut counts: HashMap<String, u64> = HashMap::new();
    for visit in visits {
        if let Some(key) = visit.referrer.as_deref().and_then(normalize_referrer) {
            *counts.entry(key).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<RefererCount> = counts
        .into_iter()
        .map(|(referer, count)| RefererCount { referer, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.referer.cmp(&b.referer)));
    ranked.truncate(limit);
    ranked
}
