//! Persistent, prioritized system-prompt sections.
//!
//! Unlike the transcript (which compaction strategies shrink),
//! [`PersistentContext`] holds the handful of always-present sections —
//! identity, rules, tool-use conventions — that should survive every
//! compaction pass because they aren't part of the conversation history
//! at all; they're re-rendered into the system prompt fresh each turn.

/// A single labeled, prioritized section of persistent context.
#[derive(Debug, Clone)]
pub struct ContextSection {
    /// Section heading.
    pub label: String,
    /// Section body.
    pub content: String,
    /// Lower renders first.
    pub priority: usize,
}

/// An ordered collection of [`ContextSection`]s rendered into one prompt.
#[derive(Debug, Default)]
pub struct PersistentContext {
    sections: Vec<ContextSection>,
}

impl PersistentContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self { sections: Vec::new() }
    }

    /// Add a section.
    pub fn add_section(&mut self, section: ContextSection) {
        self.sections.push(section);
    }

    /// Render all sections as `## {label}\n{content}`, sorted by ascending
    /// priority (ties keep insertion order), separated by a blank line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut ordered: Vec<&ContextSection> = self.sections.iter().collect();
        ordered.sort_by_key(|s| s.priority);

        ordered
            .iter()
            .map(|s| format!("## {}\n{}", s.label, s.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
