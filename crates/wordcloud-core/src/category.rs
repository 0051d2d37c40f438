//! Word categories and keyword-based auto-classification.
//!
//! Categories are a fixed catalogue. Order matters: when a word matches the
//! keywords of several categories, the first one in [`CATEGORIES`] wins.

use serde::Serialize;

/// Category assigned when nothing else matches.
pub const DEFAULT_CATEGORY: &str = "concept";

/// A logical grouping of words, rendered with its own colour by the viewer.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Category {
    pub key: &'static str,
    /// Key written by earlier releases of the word cloud server
    #[serde(skip)]
    pub legacy_key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub color: &'static str,
    pub keywords: &'static [&'static str],
}

/// The category catalogue, in matching order.
pub const CATEGORIES: &[Category] = &[
    Category {
        key: "mcp",
        legacy_key: "mcp",
        label: "MCP Server",
        description: "Installed MCP servers",
        color: "#ff6b6b",
        keywords: &["mcp", "server", "large-files", "word-cloud"],
    },
    Category {
        key: "tool",
        legacy_key: "verktyg",
        label: "Tool",
        description: "Software tools and applications",
        color: "#667eea",
        keywords: &[
            "docker", "git", "vscode", "postman", "jenkins", "terraform", "ansible",
        ],
    },
    Category {
        key: "language",
        legacy_key: "språk",
        label: "Programming language",
        description: "Programming languages",
        color: "#43e97b",
        keywords: &[
            "python",
            "javascript",
            "typescript",
            "java",
            "go",
            "rust",
            "c++",
            "c#",
        ],
    },
    Category {
        key: "framework",
        legacy_key: "ramverk",
        label: "Framework",
        description: "Frameworks and libraries",
        color: "#fa709a",
        keywords: &[
            "react", "vue", "angular", "django", "flask", "spring", "express", "fastapi",
        ],
    },
    Category {
        key: "technology",
        legacy_key: "teknologi",
        label: "Technology",
        description: "Platforms and technologies",
        color: "#f093fb",
        keywords: &[
            "kubernetes",
            "aws",
            "azure",
            "gcp",
            "cloud",
            "serverless",
            "microservices",
        ],
    },
    Category {
        key: "concept",
        legacy_key: "koncept",
        label: "Concept",
        description: "Concepts and methodology",
        color: "#4facfe",
        keywords: &[
            "agile", "scrum", "devops", "ci/cd", "tdd", "ddd", "solid", "rest", "graphql",
        ],
    },
    Category {
        key: "database",
        legacy_key: "databas",
        label: "Database",
        description: "Databases and data storage",
        color: "#30cfd0",
        keywords: &[
            "postgresql",
            "mysql",
            "mongodb",
            "redis",
            "elasticsearch",
            "cassandra",
        ],
    },
    Category {
        key: "role",
        legacy_key: "roll",
        label: "Role",
        description: "Roles and titles",
        color: "#a8edea",
        keywords: &[
            "developer",
            "architect",
            "devops",
            "engineer",
            "manager",
            "lead",
            "senior",
        ],
    },
    Category {
        key: "method",
        legacy_key: "metod",
        label: "Method",
        description: "Methods and processes",
        color: "#764ba2",
        keywords: &["agile", "scrum", "kanban", "waterfall", "lean"],
    },
];

/// Look up a category by key (case-insensitive). Legacy keys resolve to
/// the same category.
pub fn find(key: &str) -> Option<&'static Category> {
    let key = key.trim().to_lowercase();
    CATEGORIES
        .iter()
        .find(|c| c.key == key || c.legacy_key == key)
}

/// The catalogue key for `key`; unknown keys are kept as given.
pub fn canonical_key(key: &str) -> String {
    match find(key) {
        Some(category) => category.key.to_string(),
        None => key.to_string(),
    }
}

/// Pick a category for a word.
///
/// A description that names a category key wins outright. Otherwise the first
/// category with a keyword equal to, or contained in, the word or description
/// is used, falling back to [`DEFAULT_CATEGORY`].
pub fn auto_categorize(word: &str, description: &str) -> &'static str {
    if let Some(category) = find(description) {
        return category.key;
    }

    let word = word.to_lowercase();
    let description = description.to_lowercase();

    CATEGORIES
        .iter()
        .find(|category| {
            category.keywords.iter().any(|keyword| {
                word == *keyword
                    || word.contains(keyword)
                    || (!description.is_empty() && description.contains(keyword))
            })
        })
        .map(|category| category.key)
        .unwrap_or(DEFAULT_CATEGORY)
}
