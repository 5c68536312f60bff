//! Delivery address and field-scoped validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::region::ServiceableRegions;
use crate::validation::{is_valid_postal_code, is_valid_tax_id, normalize_digits};

/// Delivery address edited by the customer during checkout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub postal_code: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub region: String,
}

impl DeliveryAddress {
    /// Returns a copy with the postal code reduced to digits and every
    /// text field trimmed. An empty complement becomes `None`.
    pub fn normalized(&self) -> Self {
        Self {
            postal_code: normalize_digits(&self.postal_code),
            street: self.street.trim().to_string(),
            number: self.number.trim().to_string(),
            complement: self
                .complement
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            neighborhood: self.neighborhood.trim().to_string(),
            city: self.city.trim().to_string(),
            region: self.region.trim().to_uppercase(),
        }
    }

    /// Checks format and required fields. Does not check serviceability.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        if !is_valid_postal_code(&self.postal_code) {
            errors.push(FieldError::new(
                AddressField::PostalCode,
                "Postal code must have 8 digits",
            ));
        }

        let required = [
            (AddressField::Street, &self.street, "Street is required"),
            (AddressField::Number, &self.number, "Number is required"),
            (
                AddressField::Neighborhood,
                &self.neighborhood,
                "Neighborhood is required",
            ),
            (AddressField::City, &self.city, "City is required"),
            (AddressField::Region, &self.region, "State is required"),
        ];
        for (field, value, message) in required {
            if value.trim().is_empty() {
                errors.push(FieldError::new(field, message));
            }
        }

        ValidationError::from_errors(errors)
    }

    /// Returns true if the address lies inside the allowlist.
    pub fn is_serviceable(&self, regions: &ServiceableRegions) -> bool {
        regions.is_serviceable(&self.city, &self.region)
    }

    /// Single-line rendering used in order records.
    pub fn one_line(&self) -> String {
        let mut line = format!("{}, {}", self.street, self.number);
        if let Some(complement) = &self.complement {
            line.push_str(", ");
            line.push_str(complement);
        }
        line.push_str(&format!(
            " - {}, {}/{} - {}",
            self.neighborhood, self.city, self.region, self.postal_code
        ));
        line
    }
}

/// Validates an optional tax id: empty is accepted, anything else must
/// pass the check-digit algorithm.
pub fn validate_optional_tax_id(tax_id: Option<&str>) -> Result<Option<String>, ValidationError> {
    match tax_id.map(normalize_digits) {
        None => Ok(None),
        Some(digits) if digits.is_empty() => Ok(None),
        Some(digits) if is_valid_tax_id(&digits) => Ok(Some(digits)),
        Some(_) => Err(ValidationError::single(
            AddressField::TaxId,
            "Tax id is invalid, please check the digits",
        )),
    }
}

/// Input field a validation error is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressField {
    PostalCode,
    Street,
    Number,
    Neighborhood,
    City,
    Region,
    TaxId,
}

impl AddressField {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressField::PostalCode => "postal_code",
            AddressField::Street => "street",
            AddressField::Number => "number",
            AddressField::Neighborhood => "neighborhood",
            AddressField::City => "city",
            AddressField::Region => "region",
            AddressField::TaxId => "tax_id",
        }
    }
}

impl std::fmt::Display for AddressField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A problem with a single input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: AddressField,
    pub message: String,
}

impl FieldError {
    pub fn new(field: AddressField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// One or more field-scoped validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Invalid {}", fields_list(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

fn fields_list(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn single(field: AddressField, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }

    /// `Ok(())` when `errors` is empty.
    pub fn from_errors(errors: Vec<FieldError>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self { errors })
        }
    }

    /// Merges two validation outcomes, keeping every field error.
    pub fn merge(a: Result<(), Self>, b: Result<(), Self>) -> Result<(), Self> {
        let mut errors = Vec::new();
        for outcome in [a, b] {
            if let Err(e) = outcome {
                errors.extend(e.errors);
            }
        }
        Self::from_errors(errors)
    }

    /// Returns true if `field` has an error.
    pub fn has(&self, field: AddressField) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}
