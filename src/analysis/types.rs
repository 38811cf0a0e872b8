use std::fmt;

/// Handling decision for a detected component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentCategory {
    Reuse,
    Repair,
    Recycle,
}

impl ComponentCategory {
    pub const ALL: [ComponentCategory; 3] = [
        ComponentCategory::Reuse,
        ComponentCategory::Repair,
        ComponentCategory::Recycle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentCategory::Reuse => "Reuse",
            ComponentCategory::Repair => "Repair",
            ComponentCategory::Recycle => "Recycle",
        }
    }

    /// Exact match against the schema's category names
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == label)
    }
}

impl fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a distribution bucket; labels outside the schema are kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CategoryLabel {
    Known(ComponentCategory),
    Other(String),
}

impl CategoryLabel {
    pub fn parse(label: &str) -> Self {
        match ComponentCategory::from_label(label) {
            Some(category) => CategoryLabel::Known(category),
            None => CategoryLabel::Other(label.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CategoryLabel::Known(category) => category.as_str(),
            CategoryLabel::Other(label) => label,
        }
    }

    pub fn category(&self) -> Option<ComponentCategory> {
        match self {
            CategoryLabel::Known(category) => Some(*category),
            CategoryLabel::Other(_) => None,
        }
    }
}

impl fmt::Display for CategoryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of the classification table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryBucket {
    pub label: CategoryLabel,
    pub components: Vec<String>,
}

/// Component names per category, in the order the model listed them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentDistribution {
    buckets: Vec<CategoryBucket>,
}

impl ComponentDistribution {
    pub(crate) fn from_buckets(buckets: Vec<CategoryBucket>) -> Self {
        Self { buckets }
    }

    pub fn buckets(&self) -> &[CategoryBucket] {
        &self.buckets
    }

    pub fn get(&self, category: ComponentCategory) -> Option<&[String]> {
        self.get_label(category.as_str())
    }

    pub fn get_label(&self, label: &str) -> Option<&[String]> {
        self.buckets
            .iter()
            .find(|bucket| bucket.label.as_str() == label)
            .map(|bucket| bucket.components.as_slice())
    }

    /// Buckets whose label is not one of the three schema categories
    pub fn unknown_labels(&self) -> impl Iterator<Item = &str> {
        self.buckets
            .iter()
            .filter(|bucket| bucket.label.category().is_none())
            .map(|bucket| bucket.label.as_str())
    }

    /// Length of the longest bucket
    pub fn max_bucket_len(&self) -> usize {
        self.buckets
            .iter()
            .map(|b| b.components.len())
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Validated classification returned by the vision model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    summary: String,
    distribution: ComponentDistribution,
    swarm_action: String,
    sorter_decision: String,
    reasoning: String,
}

impl AnalysisResult {
    pub(crate) fn new(
        summary: String,
        distribution: ComponentDistribution,
        swarm_action: String,
        sorter_decision: String,
        reasoning: String,
    ) -> Self {
        Self {
            summary,
            distribution,
            swarm_action,
            sorter_decision,
            reasoning,
        }
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn distribution(&self) -> &ComponentDistribution {
        &self.distribution
    }

    pub fn swarm_action(&self) -> &str {
        &self.swarm_action
    }

    pub fn sorter_decision(&self) -> &str {
        &self.sorter_decision
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }
}
