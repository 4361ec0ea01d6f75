//! Query expansion for voice retrieval
//!
//! Callers speak in fragments ("hours", "where are you"). Short queries and
//! queries carrying a known intent stem are rewritten into fuller natural
//! language before embedding, and tagged with the info type so the search
//! threshold can be tuned per intent.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::RagError;
use vaani_config::constants::rag as rag_constants;
use vaani_text::Tokenizer;

/// Business info categories recognized in caller queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoType {
    Hours,
    Location,
    Contact,
    Policies,
    Features,
    General,
}

/// Intent stems mapped to their info type and expansion phrase
const INTENT_STEMS: &[(&str, InfoType, &str)] = &[
    ("hours", InfoType::Hours, "business hours opening hours schedule"),
    ("open", InfoType::Hours, "opening time business hours when open"),
    ("close", InfoType::Hours, "closing time business hours when closed"),
    ("timing", InfoType::Hours, "business hours timings schedule"),
    ("address", InfoType::Location, "address location directions how to reach"),
    ("location", InfoType::Location, "location address directions"),
    ("where", InfoType::Location, "location address where to find"),
    ("directions", InfoType::Location, "directions route address location"),
    ("phone", InfoType::Contact, "phone number contact details"),
    ("contact", InfoType::Contact, "contact phone email details"),
    ("email", InfoType::Contact, "email address contact details"),
    ("call", InfoType::Contact, "phone number how to contact"),
    ("policy", InfoType::Policies, "policies terms and conditions rules"),
    ("refund", InfoType::Policies, "refund policy returns cancellation"),
    ("return", InfoType::Policies, "return policy refunds exchanges"),
    ("cancel", InfoType::Policies, "cancellation policy terms"),
    ("services", InfoType::Features, "services offered features available"),
    ("offer", InfoType::Features, "offerings services products available"),
];

/// Result of query expansion
#[derive(Debug, Clone)]
pub struct ExpandedQuery {
    pub original: String,
    /// Query actually embedded
    pub expanded: String,
    pub info_type: Option<InfoType>,
    pub was_expanded: bool,
}

/// Rewrite short or intent-bearing queries into a fuller form
pub fn expand_query(query: &str, tokenizer: &Arc<Tokenizer>) -> Result<ExpandedQuery, RagError> {
    let trimmed = query.trim();
    let lower = trimmed.to_lowercase();
    let token_count = tokenizer.count_tokens(trimmed);

    let stem = INTENT_STEMS
        .iter()
        .find(|(stem, _, _)| lower.split_whitespace().any(|w| w.starts_with(stem)));

    if let Some((_, info_type, expansion)) = stem {
        return Ok(ExpandedQuery {
            original: trimmed.to_string(),
            expanded: format!("{} {}", trimmed, expansion),
            info_type: Some(*info_type),
            was_expanded: true,
        });
    }

    if token_count < 4 && !trimmed.is_empty() {
        return Ok(ExpandedQuery {
            original: trimmed.to_string(),
            expanded: format!("information about {}", trimmed),
            info_type: Some(InfoType::General),
            was_expanded: true,
        });
    }

    Ok(ExpandedQuery {
        original: trimmed.to_string(),
        expanded: trimmed.to_string(),
        info_type: None,
        was_expanded: false,
    })
}

/// Similarity threshold tuned per info type: high-recall intents drop the
/// base threshold to avoid missing the one chunk that answers them.
pub fn threshold_for(info_type: Option<InfoType>, base: f32) -> f32 {
    match info_type {
        Some(InfoType::Location) | Some(InfoType::Hours) | Some(InfoType::Contact) => {
            (base - rag_constants::INTENT_THRESHOLD_DELTA).max(0.0)
        }
        _ => base,
    }
}
