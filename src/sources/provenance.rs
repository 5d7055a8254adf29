// src/sources/provenance.rs - Deep links back to filed source documents
use anyhow::{Context, Result};
use url::Url;

/// Build an advisory deep link to the originally filed document:
/// base-path segments of collector id, filing reference, and form
/// path. Advisory metadata only; the filed document, not this link, is
/// authoritative.
pub fn filing_document_link(
    base_url: &str,
    collector_id: &str,
    filing_reference: &str,
    form_path: &str,
) -> Result<String> {
    let mut link = Url::parse(base_url).context("Provenance: invalid document base URL")?;
    {
        let mut segments = link
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Provenance: base URL cannot carry path segments"))?;
        for segment in [collector_id, filing_reference, form_path] {
            let trimmed = segment.trim_matches('/');
            if trimmed.is_empty() {
                anyhow::bail!("Provenance: empty link segment");
            }
            // a form path may itself carry sub-segments
            for part in trimmed.split('/').filter(|p| !p.is_empty()) {
                segments.push(part);
            }
        }
    }
    Ok(link.to_string())
}

/// Where to send a caller when a high-volume collector has no bulk
/// snapshot: the public browse page for that collector.
pub fn external_collector_link(collector_id: &str) -> String {
    format!("https://www.fec.gov/data/committee/{collector_id}/")
}
