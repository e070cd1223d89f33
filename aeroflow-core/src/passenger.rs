use aeroflow_shared::Masked;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{required, CoreError, CoreResult};

/// Passenger identity. The passport number is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub id: Uuid,
    pub name: String,
    pub email: Masked<String>,
    pub phone: String,
    pub passport_number: Masked<String>,
    pub date_of_birth: NaiveDate,
    pub nationality: String,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Passenger {
    pub fn passport(&self) -> &str {
        self.passport_number.expose()
    }

    /// Case-insensitive substring match over name, email and passport.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.email.expose().to_lowercase().contains(&needle)
            || self.passport().to_lowercase().contains(&needle)
    }

    pub fn apply_patch(&mut self, patch: PassengerPatch) -> CoreResult<()> {
        if let Some(name) = patch.name {
            self.name = required("Name", &name)?;
        }
        if let Some(email) = patch.email {
            self.email = Masked(normalize_email(&email)?);
        }
        if let Some(phone) = patch.phone {
            self.phone = required("Phone", &phone)?;
        }
        if let Some(passport) = patch.passport_number {
            self.passport_number = Masked(normalize_passport(&passport)?);
        }
        if let Some(dob) = patch.date_of_birth {
            self.date_of_birth = dob;
        }
        if let Some(nationality) = patch.nationality {
            self.nationality = required("Nationality", &nationality)?;
        }
        if let Some(user_id) = patch.user_id {
            self.user_id = Some(user_id);
        }
        Ok(())
    }
}

pub fn normalize_passport(value: &str) -> CoreResult<String> {
    let passport = required("Passport number", value)?.to_ascii_uppercase();
    if !passport.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CoreError::validation("Passport number must be alphanumeric"));
    }
    Ok(passport)
}

pub fn normalize_email(value: &str) -> CoreResult<String> {
    let email = required("Email", value)?.to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .rsplit_once('.')
                    .map(|(host, tld)| !host.is_empty() && tld.len() >= 2)
                    .unwrap_or(false)
        }
        None => false,
    };
    if !valid || email.contains(char::is_whitespace) {
        return Err(CoreError::validation("Please add a valid email"));
    }
    Ok(email)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPassenger {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub passport_number: String,
    pub date_of_birth: NaiveDate,
    pub nationality: String,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

impl NewPassenger {
    pub fn into_passenger(self) -> CoreResult<Passenger> {
        Ok(Passenger {
            id: Uuid::new_v4(),
            name: required("Name", &self.name)?,
            email: Masked(normalize_email(&self.email)?),
            phone: required("Phone", &self.phone)?,
            passport_number: Masked(normalize_passport(&self.passport_number)?),
            date_of_birth: self.date_of_birth,
            nationality: required("Nationality", &self.nationality)?,
            user_id: self.user_id,
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub passport_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub user_id: Option<Uuid>,
}
