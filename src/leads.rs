use anyhow::{bail, Context};

/// Standard 12-lead names in recording order.
pub const STANDARD_LEADS: [&str; 12] = [
    "I", "II", "III", "aVR", "aVL", "aVF", "V1", "V2", "V3", "V4", "V5", "V6",
];

/// Which leads of a recording to run detection on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LeadSelection {
    #[default]
    All,
    Only(Vec<usize>),
}

impl LeadSelection {
    /// Resolved lead indices for a recording with `lead_count` leads.
    pub fn resolve(&self, lead_count: usize) -> anyhow::Result<Vec<usize>> {
        match self {
            LeadSelection::All => Ok((0..lead_count).collect()),
            LeadSelection::Only(leads) => {
                if let Some(&lead) = leads.iter().find(|&&l| l >= lead_count) {
                    bail!("Lead {} selected but the recording has {} leads", lead, lead_count);
                }
                Ok(leads.clone())
            }
        }
    }
}

fn parse_lead(token: &str) -> anyhow::Result<usize> {
    if let Some(pos) = STANDARD_LEADS.iter().position(|name| name.eq_ignore_ascii_case(token)) {
        return Ok(pos);
    }
    token
        .parse::<usize>()
        .with_context(|| format!("Unknown lead '{}'", token))
}

impl std::str::FromStr for LeadSelection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(LeadSelection::All);
        }

        let mut leads = Vec::new();
        for token in s.split(',').map(str::trim) {
            if token.is_empty() {
                bail!("Empty lead in selection '{}'", s);
            }
            let lead = parse_lead(token)?;
            if leads.contains(&lead) {
                bail!("Lead '{}' selected twice", token);
            }
            leads.push(lead);
        }
        Ok(LeadSelection::Only(leads))
    }
}
