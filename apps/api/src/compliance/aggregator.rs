use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::auth::models::{Role, UserProfile};
use crate::models::document::{ComplianceStatus, DocumentCategory, DocumentRecord};

/// Below this percentage an employee is flagged as having issues.
pub const ISSUES_THRESHOLD: u32 = 50;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryStatus {
    pub category: DocumentCategory,
    pub label: &'static str,
    pub status: ComplianceStatus,
    pub document_count: usize,
}

/// Derived per request from one user's documents; never stored.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ComplianceSummary {
    pub required_total: u32,
    pub approved_count: u32,
    pub pending_count: u32,
    pub rejected_count: u32,
    pub percentage: u32,
    pub categories: Vec<CategoryStatus>,
    pub is_compliant: bool,
    pub has_issues: bool,
}

/// Effective status of one category: any approval wins, then any rejection,
/// otherwise pending (including when nothing was submitted).
pub fn effective_status<'a, I>(records: I) -> ComplianceStatus
where
    I: IntoIterator<Item = &'a DocumentRecord>,
{
    let mut any_rejected = false;
    for record in records {
        match record.status {
            ComplianceStatus::Approved => return ComplianceStatus::Approved,
            ComplianceStatus::Rejected => any_rejected = true,
            ComplianceStatus::Pending => {}
        }
    }
    if any_rejected {
        ComplianceStatus::Rejected
    } else {
        ComplianceStatus::Pending
    }
}

/// `round(100 * approved / total)` with halves rounded up; 0 when `total` is 0.
pub fn percentage(approved: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (approved, total) = (approved as u64, total as u64);
    ((200 * approved + total) / (2 * total)) as u32
}

/// Summarises one user's records against the required categories.
/// Records in categories that are not required are ignored.
pub fn summarize(records: &[DocumentRecord], required_categories: &[DocumentCategory]) -> ComplianceSummary {
    let mut approved_count = 0;
    let mut pending_count = 0;
    let mut rejected_count = 0;
    let mut categories = Vec::with_capacity(required_categories.len());

    for &category in required_categories {
        let in_category: Vec<&DocumentRecord> =
            records.iter().filter(|r| r.category == category).collect();
        let status = effective_status(in_category.iter().copied());
        match status {
            ComplianceStatus::Approved => approved_count += 1,
            ComplianceStatus::Pending => pending_count += 1,
            ComplianceStatus::Rejected => rejected_count += 1,
        }
        categories.push(CategoryStatus {
            category,
            label: category.label(),
            status,
            document_count: in_category.len(),
        });
    }

    let required_total = required_categories.len() as u32;
    let percentage = percentage(approved_count, required_total);
    ComplianceSummary {
        required_total,
        approved_count,
        pending_count,
        rejected_count,
        percentage,
        categories,
        is_compliant: required_total > 0 && percentage == 100,
        has_issues: percentage < ISSUES_THRESHOLD,
    }
}

/// Raw document counts across the organisation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OrganizationStats {
    pub total_employees: usize,
    pub total_documents: usize,
    pub pending_documents: usize,
    pub approved_documents: usize,
    pub rejected_documents: usize,
}

pub fn organization_stats(total_employees: usize, records: &[DocumentRecord]) -> OrganizationStats {
    let count = |status: ComplianceStatus| records.iter().filter(|r| r.status == status).count();
    OrganizationStats {
        total_employees,
        total_documents: records.len(),
        pending_documents: count(ComplianceStatus::Pending),
        approved_documents: count(ComplianceStatus::Approved),
        rejected_documents: count(ComplianceStatus::Rejected),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeCompliance {
    pub user_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub summary: ComplianceSummary,
}

/// Case-insensitive substring match on display name or email. An empty search matches everyone.
pub fn matches_search(profile: &UserProfile, search: &str) -> bool {
    let needle = search.trim().to_lowercase();
    needle.is_empty()
        || profile.principal.display_name.to_lowercase().contains(&needle)
        || profile.principal.email.to_lowercase().contains(&needle)
}

/// Per-user compliance for every profile matching `search`, in profile order.
pub fn employee_overview(
    profiles: &[UserProfile],
    records: &[DocumentRecord],
    required_categories: &[DocumentCategory],
    search: &str,
) -> Vec<EmployeeCompliance> {
    let mut by_owner: HashMap<Uuid, Vec<DocumentRecord>> = HashMap::new();
    for record in records {
        by_owner.entry(record.owner_id).or_default().push(record.clone());
    }

    profiles
        .iter()
        .filter(|p| matches_search(p, search))
        .map(|p| {
            let owned = by_owner
                .get(&p.principal.user_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            EmployeeCompliance {
                user_id: p.principal.user_id,
                display_name: p.principal.display_name.clone(),
                email: p.principal.email.clone(),
                role: p.principal.role,
                summary: summarize(owned, required_categories),
            }
        })
        .collect()
}
