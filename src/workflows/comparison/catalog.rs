use super::domain::{Dimension, DimensionKind};

/// Hard cap on how many dimensions one comparison may select.
pub const MAX_SELECTED_DIMENSIONS: usize = 5;

fn general_dimension(id: &str, name: &str, keywords: &[&str]) -> Dimension {
    Dimension {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        kind: DimensionKind::General,
        keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
    }
}

/// The fixed general rubric every RFP is offered, with the keyword lists the
/// fallback heuristics match against.
pub fn general_dimensions() -> Vec<Dimension> {
    vec![
        general_dimension(
            "experience",
            "Experience",
            &[
                "experience",
                "years",
                "projects",
                "portfolio",
                "completed",
                "similar",
            ],
        ),
        general_dimension("cost", "Cost", &["price", "budget", "cost", "fee", "rate"]),
        general_dimension(
            "materials_warranty",
            "Materials/Warranty",
            &["materials", "warranty", "guarantee", "quality", "grade"],
        ),
        general_dimension(
            "schedule",
            "Schedule",
            &[
                "schedule",
                "timeline",
                "start",
                "completion",
                "days",
                "weeks",
            ],
        ),
        general_dimension(
            "safety",
            "Safety",
            &["safety", "osha", "compliance", "training", "incident"],
        ),
        general_dimension(
            "responsiveness",
            "Responsiveness",
            &["responsive", "communication", "availability", "support"],
        ),
    ]
}

/// Sanitize externally discovered dimensions before they join the catalog:
/// entries without an id or name are dropped, anything colliding with a known
/// id is dropped, and the surviving entries are forced to `dynamic`.
pub fn sanitize_dynamic_dimensions(
    candidates: Vec<Dimension>,
    known: &[Dimension],
) -> Vec<Dimension> {
    let mut accepted: Vec<Dimension> = Vec::new();
    for mut candidate in candidates {
        candidate.id = candidate.id.trim().to_string();
        candidate.name = candidate.name.trim().to_string();
        if candidate.id.is_empty() || candidate.name.is_empty() {
            continue;
        }
        if known.iter().any(|dimension| dimension.id == candidate.id)
            || accepted.iter().any(|dimension| dimension.id == candidate.id)
        {
            continue;
        }
        candidate.kind = DimensionKind::Dynamic;
        accepted.push(candidate);
    }
    accepted
}

/// Order-preserving, deduplicated dimension pick, capped at
/// [`MAX_SELECTED_DIMENSIONS`]. Inserting beyond the cap is a no-op that
/// leaves the selection untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DimensionSelection {
    ids: Vec<String>,
}

impl DimensionSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut selection = Self::new();
        for id in ids {
            selection.insert(&id);
        }
        selection
    }

    /// Returns whether the id was added. Duplicates, blanks, and inserts past
    /// the cap report `false` without changing the selection.
    pub fn insert(&mut self, id: &str) -> bool {
        let id = id.trim();
        if id.is_empty() || self.contains(id) || self.ids.len() >= MAX_SELECTED_DIMENSIONS {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|selected| selected != id);
        self.ids.len() != before
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|selected| selected == id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
