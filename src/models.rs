use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    utils::split_coordinates,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewRestaurant {
    pub name: String,
    /// `lat,long` coordinate string.
    pub location: String,
    pub cuisines: Vec<String>,
}

impl NewRestaurant {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation {
                field: "name",
                reason: "must not be empty".into(),
            });
        }

        split_coordinates(&self.location)?;

        if self.cuisines.is_empty() {
            return Err(Error::Validation {
                field: "cuisines",
                reason: "at least one cuisine is required".into(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub location: String,
    pub cuisines: Vec<String>,
}

/// The read-side projection of a restaurant: public fields plus the cuisine
/// set, with the view counter already incremented for this read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantView {
    pub id: String,
    pub name: String,
    pub view_count: i64,
    pub cuisines: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: u8,
    #[serde(default)]
    pub text: Option<String>,
}

impl NewReview {
    pub fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.rating) {
            return Err(Error::Validation {
                field: "rating",
                reason: format!("must be between 1 and 5, got {}", self.rating),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub restaurant_id: String,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Creation time in unix milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedRestaurant {
    pub id: String,
    /// Absent when the canonical hash is missing for a ranked id.
    pub name: Option<String>,
    pub average_rating: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant() -> NewRestaurant {
        NewRestaurant {
            name: "Trattoria Da Mario".into(),
            location: "45.46,9.19".into(),
            cuisines: vec!["italian".into(), "pizza".into()],
        }
    }

    #[test]
    fn test_valid_restaurant() {
        assert!(restaurant().validate().is_ok());
    }

    #[test]
    fn test_rejects_blank_name() {
        let mut new = restaurant();
        new.name = "   ".into();
        assert!(new.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_location() {
        let mut new = restaurant();
        new.location = "downtown".into();
        assert!(new.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_cuisines() {
        let mut new = restaurant();
        new.cuisines.clear();
        assert!(new.validate().is_err());
    }

    #[test]
    fn test_rating_bounds() {
        assert!(NewReview { rating: 0, text: None }.validate().is_err());
        assert!(NewReview { rating: 6, text: None }.validate().is_err());

        for rating in 1..=5 {
            assert!(NewReview { rating, text: None }.validate().is_ok());
        }
    }
}
