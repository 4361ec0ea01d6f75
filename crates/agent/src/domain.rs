//! Domain detection and prompt templating
//!
//! When `config.domain` is not set, the domain is inferred from the
//! agent's name, role, system prompt, and business type. The domain picks
//! the prompt template wrapped around the tenant's system prompt and the
//! default tool set offered to new agents.

use serde::{Deserialize, Serialize};

/// Business vertical an agent operates in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentDomain {
    Restaurant,
    Healthcare,
    Retail,
    RealEstate,
    Support,
    #[default]
    General,
}

const DOMAIN_KEYWORDS: &[(AgentDomain, &[&str])] = &[
    (
        AgentDomain::Restaurant,
        &["restaurant", "menu", "reservation", "table", "dining", "chef", "cuisine", "takeout"],
    ),
    (
        AgentDomain::Healthcare,
        &["clinic", "doctor", "patient", "appointment", "medical", "health", "dental", "pharmacy"],
    ),
    (
        AgentDomain::Retail,
        &["store", "shop", "product", "order", "inventory", "price", "stock", "catalog"],
    ),
    (
        AgentDomain::RealEstate,
        &["property", "listing", "rent", "lease", "apartment", "realtor", "viewing", "tenant"],
    ),
    (
        AgentDomain::Support,
        &["support", "helpdesk", "ticket", "troubleshoot", "issue", "customer service"],
    ),
];

impl AgentDomain {
    /// Infer the domain from agent descriptors. Ties go to the earlier
    /// entry in the keyword table; no hits mean `General`.
    pub fn detect(
        name: &str,
        role: Option<&str>,
        system_prompt: &str,
        business_type: Option<&str>,
    ) -> Self {
        let haystack = format!(
            "{} {} {} {}",
            name,
            role.unwrap_or(""),
            system_prompt,
            business_type.unwrap_or("")
        )
        .to_lowercase();

        let mut best = (AgentDomain::General, 0usize);
        for (domain, keywords) in DOMAIN_KEYWORDS {
            let score = keywords.iter().filter(|k| haystack.contains(**k)).count();
            if score > best.1 {
                best = (*domain, score);
            }
        }
        best.0
    }

    pub fn from_config(value: &serde_json::Value) -> Option<Self> {
        value
            .get("domain")
            .and_then(serde_json::Value::as_str)
            .and_then(|s| serde_json::from_value(serde_json::Value::String(s.to_string())).ok())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentDomain::Restaurant => "restaurant",
            AgentDomain::Healthcare => "healthcare",
            AgentDomain::Retail => "retail",
            AgentDomain::RealEstate => "real_estate",
            AgentDomain::Support => "support",
            AgentDomain::General => "general",
        }
    }

    /// Domain-specific guidance appended to the system prompt
    fn guidance(&self) -> &'static str {
        match self {
            AgentDomain::Restaurant => {
                "Help callers with menu questions, reservations, hours, and takeout orders. \
                 Confirm party size and time before finalizing a reservation."
            }
            AgentDomain::Healthcare => {
                "Help callers schedule and manage appointments. Never give medical advice; \
                 route clinical questions to staff."
            }
            AgentDomain::Retail => {
                "Help callers with product availability, pricing, orders, and store policies."
            }
            AgentDomain::RealEstate => {
                "Help callers with listings, viewings, and application steps. Capture contact \
                 details for follow-up."
            }
            AgentDomain::Support => {
                "Help callers resolve issues. Gather the problem description before offering \
                 steps, and escalate when stuck."
            }
            AgentDomain::General => {
                "Help callers with their questions about the business."
            }
        }
    }

    /// Tool names enabled for new agents in this domain
    pub fn default_tools(&self) -> &'static [&'static str] {
        match self {
            AgentDomain::Support => &[
                "search_knowledge",
                "get_information",
                "get_business_info",
                "transfer_call",
                "end_call",
            ],
            _ => &[
                "search_knowledge",
                "get_business_info",
                "transfer_call",
                "end_call",
            ],
        }
    }
}

/// Build the denormalized full prompt from the system prompt and domain
/// template. Rebuilt on every write that touches the system prompt.
pub fn build_full_prompt(
    system_prompt: &str,
    domain: AgentDomain,
    persona_name: Option<&str>,
    language: &str,
) -> String {
    let mut prompt = String::new();

    if let Some(persona) = persona_name {
        prompt.push_str(&format!("You are {}, a voice assistant. ", persona));
    } else {
        prompt.push_str("You are a voice assistant. ");
    }
    prompt.push_str(&format!(
        "Speak naturally and keep answers short; this is a phone call. Reply in {}.\n\n",
        language
    ));

    prompt.push_str(system_prompt.trim());
    prompt.push_str("\n\n");
    prompt.push_str(domain.guidance());

    prompt
}
