use serde::{Deserialize, Deserializer, Serialize};

use crate::error::InputError;

/// One counted product line.
///
/// Serialized with the field names used by the persisted list
/// (`productNumber`, `quantity`, `unit`, `expiryDate`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub product_number: String,
    /// Always > 0
    #[serde(deserialize_with = "quantity_from_number_or_string")]
    pub quantity: u32,
    pub unit: String,
    /// Free text, usually `YYYYMMDD`; empty when not given
    #[serde(default)]
    pub expiry_date: String,
}

/// Older lists stored the quantity as the string typed into the form.
fn quantity_from_number_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid quantity: {:?}", s))),
    }
}

/// Form fields as typed, before validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemForm {
    pub product_number: String,
    pub quantity: String,
    pub unit: String,
    pub expiry_date: String,
}

/// Editable form fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormField {
    ProductNumber,
    Quantity,
    Unit,
    ExpiryDate,
}

impl ItemForm {
    /// Empty form with the unit preselected.
    pub fn with_unit(unit: &str) -> Self {
        Self {
            unit: unit.to_string(),
            ..Self::default()
        }
    }

    pub fn set(&mut self, field: FormField, value: String) {
        match field {
            FormField::ProductNumber => self.product_number = value,
            FormField::Quantity => self.quantity = value,
            FormField::Unit => self.unit = value,
            FormField::ExpiryDate => self.expiry_date = value,
        }
    }

    /// Checks the required fields and builds the item.
    pub fn validate(&self) -> Result<InventoryItem, InputError> {
        let product_number = self.product_number.trim();
        if product_number.is_empty() {
            return Err(InputError::MissingProductNumber);
        }

        let quantity = self.quantity.trim();
        if quantity.is_empty() {
            return Err(InputError::MissingQuantity);
        }
        let quantity: u32 = match quantity.parse() {
            Ok(n) if n > 0 => n,
            _ => return Err(InputError::InvalidQuantity(quantity.to_string())),
        };

        Ok(InventoryItem {
            product_number: product_number.to_string(),
            quantity,
            unit: self.unit.trim().to_string(),
            expiry_date: self.expiry_date.trim().to_string(),
        })
    }
}

/// Formats an 8-character `YYYYMMDD` expiry as `YYYY-MM-DD` for display.
/// Anything else is returned unchanged.
pub fn format_expiry(expiry: &str) -> String {
    if expiry.len() == 8 && expiry.is_ascii() {
        format!("{}-{}-{}", &expiry[0..4], &expiry[4..6], &expiry[6..8])
    } else {
        expiry.to_string()
    }
}
