//! Add-agent form validation.

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::types::NewAgent;

/// Palette new agents draw their display color from.
pub const AGENT_COLORS: [&str; 5] = [
    "hsl(142.1 76.2% 36.3%)",
    "hsl(346.8 77.2% 49.8%)",
    "hsl(262.1 83.3% 57.8%)",
    "hsl(47.9 95.8% 53.1%)",
    "hsl(339.2 82.2% 51.4%)",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{0} must not be empty")]
    MissingField(&'static str),
}

/// Raw user input for a new agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentForm {
    pub name: String,
    pub role: String,
    pub description: String,
}

impl AgentForm {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            description: description.into(),
        }
    }

    /// Trim every field and build the creation request.
    ///
    /// All three fields are required. The avatar is the uppercased first
    /// letter of the name; the color is picked at random from [`AGENT_COLORS`].
    pub fn validate(&self) -> Result<NewAgent, FormError> {
        self.validate_with_rng(&mut rand::thread_rng())
    }

    pub fn validate_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<NewAgent, FormError> {
        let name = required("name", &self.name)?;
        let role = required("role", &self.role)?;
        let description = required("description", &self.description)?;

        let avatar = name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default();
        let color = AGENT_COLORS
            .choose(rng)
            .copied()
            .unwrap_or(AGENT_COLORS[0])
            .to_string();

        Ok(NewAgent {
            name,
            role,
            description,
            color,
            avatar,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FormError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_validate_trims_and_derives_avatar() {
        let form = AgentForm::new("  data analyst ", " Analysis ", " Crunches numbers\n");
        let agent = form.validate_with_rng(&mut StdRng::seed_from_u64(7)).unwrap();

        assert_eq!(agent.name, "data analyst");
        assert_eq!(agent.role, "Analysis");
        assert_eq!(agent.description, "Crunches numbers");
        assert_eq!(agent.avatar, "D");
        assert!(AGENT_COLORS.contains(&agent.color.as_str()));
    }

    #[test]
    fn test_blank_field_is_rejected() {
        let form = AgentForm::new("Analyst", "   ", "Crunches numbers");
        assert_eq!(form.validate(), Err(FormError::MissingField("role")));
    }

    #[test]
    fn test_first_missing_field_is_reported() {
        let form = AgentForm::default();
        assert_eq!(form.validate(), Err(FormError::MissingField("name")));
    }

    #[test]
    fn test_avatar_uppercases_non_ascii() {
        let form = AgentForm::new("élan", "Muse", "Inspires");
        assert_eq!(form.validate().unwrap().avatar, "É");
    }
}
