//! Buyer and shipping fields (`vads_cust_*`, `vads_ship_to_*`).

use lyra_core::FieldSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub zip: String,
    pub city: String,
    pub state: String,
    /// ISO 3166 alpha-2 country code.
    pub country: String,
    pub email: String,
    pub phone: String,
    /// Delivery address. Billing values are reused when absent.
    pub shipping: Option<ShippingAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub zip: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub phone: String,
}

/// Keep at most `max` characters.
fn truncate(value: &str, max: usize) -> String {
    value.trim().chars().take(max).collect()
}

impl Customer {
    /// Write the buyer and shipping fields into `fields`.
    pub fn apply(&self, fields: &mut FieldSet) {
        fields.insert("vads_cust_id", truncate(&self.id, 63));
        fields.insert("vads_cust_first_name", truncate(&self.first_name, 62));
        fields.insert("vads_cust_last_name", truncate(&self.last_name, 62));
        fields.insert("vads_cust_address", truncate(&self.address, 254));
        fields.insert("vads_cust_zip", truncate(&self.zip, 62));
        fields.insert("vads_cust_city", truncate(&self.city, 62));
        fields.insert("vads_cust_state", truncate(&self.state, 62));
        fields.insert("vads_cust_country", self.country.trim().to_uppercase());
        fields.insert("vads_cust_email", truncate(&self.email, 126));
        fields.insert("vads_cust_phone", truncate(&self.phone, 31));

        let shipping = self
            .shipping
            .clone()
            .unwrap_or_else(|| self.billing_as_shipping());

        fields.insert("vads_ship_to_first_name", truncate(&shipping.first_name, 62));
        fields.insert("vads_ship_to_last_name", truncate(&shipping.last_name, 62));
        fields.insert("vads_ship_to_street", truncate(&shipping.street, 62));
        fields.insert("vads_ship_to_zip", truncate(&shipping.zip, 62));
        fields.insert("vads_ship_to_city", truncate(&shipping.city, 62));
        fields.insert("vads_ship_to_state", truncate(&shipping.state, 62));
        fields.insert("vads_ship_to_country", shipping.country.trim().to_uppercase());
        fields.insert("vads_ship_to_phone_num", truncate(&shipping.phone, 31));
    }

    fn billing_as_shipping(&self) -> ShippingAddress {
        ShippingAddress {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            street: self.address.clone(),
            zip: self.zip.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
            phone: self.phone.clone(),
        }
    }
}
