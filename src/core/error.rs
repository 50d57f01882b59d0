use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("Invalid scenario: {field} {reason}")]
    InvalidScenario { field: String, reason: String },
}

impl SimulationError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        SimulationError::InvalidScenario {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            SimulationError::InvalidScenario { field, .. } => field,
        }
    }
}

pub type SimulationOutcome<T> = Result<T, SimulationError>;
