//! Validation Utilities

use validator::ValidationErrors;

use super::error::GatewayError;

/// Convert validation errors to a gateway validation error.
///
/// Collapses the field map into a single human-readable message, first
/// field first, the same shape the original serializer errors had.
pub fn validation_error(errors: ValidationErrors) -> GatewayError {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let detail = e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, detail)
            })
        })
        .collect();
    parts.sort();

    let message = if parts.is_empty() {
        "Invalid message".to_string()
    } else {
        format!("Invalid message: {}", parts.join(", "))
    };

    GatewayError::Validation { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(max = 4, message = "too long"))]
        text: String,
    }

    #[test]
    fn field_errors_are_flattened_into_one_message() {
        let probe = Probe {
            text: "way too long".into(),
        };
        let err = validation_error(probe.validate().unwrap_err());
        assert_eq!(err.to_string(), "Invalid message: text: too long");
    }
}
