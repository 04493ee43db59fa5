use chrono::Utc;
use prospector_core::{Community, QualityTier};

use crate::discovery::estimate_posts_per_day;

/// Relevance assigned to curated entries. Deliberately below the discovery
/// score: these trade relevance for availability.
const CURATED_RELEVANCE: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackCategory {
    Business,
    Technology,
    General,
}

const BUSINESS_TOKENS: &[&str] = &[
    "business",
    "startup",
    "entrepreneur",
    "saas",
    "marketing",
    "sales",
    "ecommerce",
    "finance",
];

const TECHNOLOGY_TOKENS: &[&str] = &[
    "tech",
    "ai",
    "software",
    "programming",
    "developer",
    "code",
    "data",
    "machine learning",
];

/// Name, display name, description, subscriber and active-user estimates
/// for the curated sets. Static data, updated by hand.
type CuratedEntry = (&'static str, &'static str, &'static str, u64, u64);

const BUSINESS_SET: &[CuratedEntry] = &[
    (
        "entrepreneur",
        "Entrepreneur",
        "Founders discussing starting and growing companies",
        1_600_000,
        4_200,
    ),
    (
        "smallbusiness",
        "Small Business",
        "Questions and war stories from small business owners",
        950_000,
        2_800,
    ),
    (
        "startups",
        "Startups",
        "Startup strategy, fundraising and growth",
        840_000,
        2_100,
    ),
    (
        "saas",
        "SaaS",
        "Building and selling software as a service",
        130_000,
        900,
    ),
    (
        "marketing",
        "Marketing",
        "Marketing tactics, channels and analytics",
        460_000,
        1_500,
    ),
];

const TECHNOLOGY_SET: &[CuratedEntry] = &[
    (
        "technology",
        "Technology",
        "General technology news and discussion",
        2_400_000,
        9_500,
    ),
    (
        "programming",
        "Programming",
        "Software development discussion",
        3_100_000,
        7_800,
    ),
    (
        "machinelearning",
        "Machine Learning",
        "Research and practice of machine learning",
        2_000_000,
        3_400,
    ),
    (
        "webdev",
        "Web Development",
        "Building things for the web",
        810_000,
        2_600,
    ),
    (
        "artificial",
        "Artificial Intelligence",
        "AI tools, news and applications",
        190_000,
        1_100,
    ),
];

const GENERAL_SET: &[CuratedEntry] = &[
    (
        "popular",
        "Popular",
        "The most active discussions across the platform",
        3_500_000,
        15_000,
    ),
    (
        "news",
        "News",
        "Current events and breaking stories",
        2_200_000,
        8_200,
    ),
    (
        "todayilearned",
        "Today I Learned",
        "Interesting facts and discoveries",
        2_800_000,
        6_400,
    ),
    (
        "askanything",
        "Ask Anything",
        "Open question-and-answer threads",
        1_900_000,
        7_100,
    ),
    (
        "interestingstuff",
        "Interesting Stuff",
        "A grab bag of notable finds",
        620_000,
        1_900,
    ),
];

/// Category heuristic over the request keywords. Business tokens win over
/// technology tokens when both appear, which keeps the choice deterministic.
pub fn categorize(keywords: &[String]) -> FallbackCategory {
    let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    let contains_any = |tokens: &[&str]| {
        lowered
            .iter()
            .any(|k| tokens.iter().any(|t| k.contains(t)))
    };

    if contains_any(BUSINESS_TOKENS) {
        FallbackCategory::Business
    } else if contains_any(TECHNOLOGY_TOKENS) {
        FallbackCategory::Technology
    } else {
        FallbackCategory::General
    }
}

/// Curated candidates for when discovery comes back empty. Always
/// non-empty, so the pipeline always has sources to crawl.
pub fn fallback_communities(keywords: &[String]) -> Vec<Community> {
    let category = categorize(keywords);
    let set = match category {
        FallbackCategory::Business => BUSINESS_SET,
        FallbackCategory::Technology => TECHNOLOGY_SET,
        FallbackCategory::General => GENERAL_SET,
    };

    tracing::info!(
        "Discovery returned nothing usable, using curated {:?} set ({} communities)",
        category,
        set.len()
    );

    set.iter()
        .map(|(name, display_name, description, subscribers, active)| Community {
            id: name.to_string(),
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            subscribers: *subscribers,
            active_users: *active,
            posts_per_day: estimate_posts_per_day(Some(*active), *subscribers),
            relevance_score: CURATED_RELEVANCE,
            tier: QualityTier::for_subscribers(*subscribers),
            tags: vec!["curated".to_string()],
            last_updated: Utc::now(),
        })
        .collect()
}
