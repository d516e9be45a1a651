//! The static about page.

use std::fmt::Write as _;

/// Application name.
pub const APP_TITLE: &str = "NexusAI";

/// Tagline shown under the name.
pub const APP_SUBTITLE: &str = "AI Assistant with Intelligence";

/// Short description of the project.
pub const DESCRIPTION: &str = "NexusAI is an AI assistant that combines LLM integration, \
real-time web search, semantic memory, and vision AI behind a streaming chat interface.";

/// A feature highlighted on the about page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    pub icon: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

/// A component of the technology stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TechItem {
    pub name: &'static str,
    pub category: &'static str,
}

pub const FEATURES: &[Feature] = &[
    Feature {
        icon: "⚡",
        title: "Streaming Responses",
        description: "Real-time word-by-word text generation",
    },
    Feature {
        icon: "🔍",
        title: "Web Search",
        description: "Tavily API for current information",
    },
    Feature {
        icon: "💾",
        title: "Semantic Memory",
        description: "Pinecone vector database for context",
    },
    Feature {
        icon: "👁️",
        title: "Vision AI",
        description: "Image understanding capability",
    },
    Feature {
        icon: "🔄",
        title: "Multi-Model",
        description: "Dynamic model selection",
    },
    Feature {
        icon: "🎨",
        title: "Theme Support",
        description: "Light and dark mode",
    },
];

pub const TECH_STACK: &[TechItem] = &[
    TechItem { name: "OpenAI GPT", category: "LLM" },
    TechItem { name: "LangChain", category: "Framework" },
    TechItem { name: "Tavily", category: "Search" },
    TechItem { name: "Pinecone", category: "Vector DB" },
    TechItem { name: "FastAPI", category: "Backend" },
    TechItem { name: "Rust", category: "Client" },
];

/// Renders the about page as terminal text.
pub fn render_text() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{APP_TITLE} - {APP_SUBTITLE}");
    let _ = writeln!(out);
    let _ = writeln!(out, "{DESCRIPTION}");
    let _ = writeln!(out);
    let _ = writeln!(out, "Features:");
    for feature in FEATURES {
        let _ = writeln!(
            out,
            "  {} {}: {}",
            feature.icon, feature.title, feature.description
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Tech stack:");
    let width = TECH_STACK.iter().map(|t| t.category.len()).max().unwrap_or(0);
    for item in TECH_STACK {
        let _ = writeln!(out, "  {:<width$}  {}", item.category, item.name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn about_lists_everything() {
        let text = render_text();
        assert!(text.starts_with("NexusAI - AI Assistant with Intelligence\n"));
        for feature in FEATURES {
            assert!(text.contains(feature.title));
        }
        for item in TECH_STACK {
            assert!(text.contains(item.name));
        }
        assert!(text.contains("  Vector DB  Pinecone\n"));
    }
}
