use serde::{Deserialize, Serialize};

/// Budget bucket every fine-grained category label rolls up into. The UI
/// aggregates by group, so classification must be reproducible from the
/// label alone regardless of which extraction path produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryGroup {
    Essential,
    Health,
    Education,
    Transport,
    Social,
    Investments,
    Income,
}

impl CategoryGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryGroup::Essential => "Essential",
            CategoryGroup::Health => "Health",
            CategoryGroup::Education => "Education",
            CategoryGroup::Transport => "Transport",
            CategoryGroup::Social => "Social",
            CategoryGroup::Investments => "Investments",
            CategoryGroup::Income => "Income",
        }
    }
}

impl std::fmt::Display for CategoryGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category labels offered to the oracle when the caller supplies no custom
/// catalog. Keeping this list keyword-aligned with the rule table below means
/// catalog categories classify into the intended group.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Housing",
    "Groceries",
    "Utilities",
    "Health",
    "Pharmacy",
    "Education",
    "Transport",
    "Restaurants",
    "Entertainment",
    "Travel",
    "Subscriptions",
    "Investments",
    "Salary",
    "Other",
];

/// Ordered substring rules, evaluated top-to-bottom against the lowercased
/// label. First match wins.
const RULES: &[(&str, CategoryGroup)] = &[
    ("salary", CategoryGroup::Income),
    ("payroll", CategoryGroup::Income),
    ("dividend", CategoryGroup::Income),
    ("income", CategoryGroup::Income),
    ("invest", CategoryGroup::Investments),
    ("broker", CategoryGroup::Investments),
    ("treasury", CategoryGroup::Investments),
    ("pension", CategoryGroup::Investments),
    ("health", CategoryGroup::Health),
    ("pharma", CategoryGroup::Health),
    ("medic", CategoryGroup::Health),
    ("dental", CategoryGroup::Health),
    ("dentist", CategoryGroup::Health),
    ("hospital", CategoryGroup::Health),
    ("education", CategoryGroup::Education),
    ("school", CategoryGroup::Education),
    ("tuition", CategoryGroup::Education),
    ("course", CategoryGroup::Education),
    ("book", CategoryGroup::Education),
    ("transport", CategoryGroup::Transport),
    ("uber", CategoryGroup::Transport),
    ("taxi", CategoryGroup::Transport),
    ("fuel", CategoryGroup::Transport),
    ("parking", CategoryGroup::Transport),
    ("toll", CategoryGroup::Transport),
    ("restaurant", CategoryGroup::Social),
    ("bar", CategoryGroup::Social),
    ("cinema", CategoryGroup::Social),
    ("entertainment", CategoryGroup::Social),
    ("travel", CategoryGroup::Social),
    ("streaming", CategoryGroup::Social),
    ("subscription", CategoryGroup::Social),
    ("leisure", CategoryGroup::Social),
];

/// Maps a free-text category label to its group. Total over all inputs:
/// unknown or empty labels fall back to the Essential group.
pub fn classify(label: &str) -> CategoryGroup {
    let needle = label.to_lowercase();
    for (keyword, group) in RULES {
        if needle.contains(keyword) {
            return *group;
        }
    }
    CategoryGroup::Essential
}
