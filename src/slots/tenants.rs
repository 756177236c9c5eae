//! Tenant name extraction

use crate::entity_linking::normalize::{title_case, word_bounded_positions};
use crate::entity_linking::EntityCatalog;
use crate::patterns::tenant_references;

/// Known tenant names mentioned in `text`, in mention order.
///
/// Names are tried longest first and each match consumes its span, so
/// "Tenant 14" is never also reported as "Tenant 1".
pub fn extract_tenant_names(text: &str, catalog: &EntityCatalog, max: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut taken: Vec<(usize, usize)> = Vec::new();
    let mut found: Vec<(usize, String)> = Vec::new();

    for tenant in catalog.known_tenants() {
        if found.len() >= max {
            break;
        }
        let needle = tenant.to_lowercase();
        let free = word_bounded_positions(&lowered, &needle).find(|&start| {
            let end = start + needle.len();
            !taken.iter().any(|&(s, e)| start < e && s < end)
        });
        if let Some(start) = free {
            taken.push((start, start + needle.len()));
            found.push((start, tenant.clone()));
        }
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, tenant)| tenant).collect()
}

/// "Tenant N" references that name no known tenant, title-cased
pub fn missing_tenant_references(text: &str, catalog: &EntityCatalog) -> Vec<String> {
    tenant_references(text)
        .into_iter()
        .filter(|reference| {
            !catalog
                .known_tenants()
                .iter()
                .any(|t| t.eq_ignore_ascii_case(reference))
        })
        .map(|reference| title_case(&reference))
        .collect()
}
