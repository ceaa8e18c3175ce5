//! Key layout for everything persisted in Redis. All keys share one prefix
//! with colon-separated segments.

pub const PREFIX: &str = "bites";

fn key_name(parts: &[&str]) -> String {
    format!("{}:{}", PREFIX, parts.join(":"))
}

pub fn restaurant(id: &str) -> String {
    key_name(&["restaurants", id])
}

pub fn review_ledger(restaurant_id: &str) -> String {
    key_name(&["reviews", restaurant_id])
}

pub fn review_details(review_id: &str) -> String {
    key_name(&["reviews_details", review_id])
}

pub fn cuisines() -> String {
    key_name(&["cuisines"])
}

pub fn cuisine(name: &str) -> String {
    key_name(&["cuisine", name])
}

pub fn restaurant_cuisines(restaurant_id: &str) -> String {
    key_name(&["restaurants_by_cuisine", restaurant_id])
}

pub fn ratings() -> String {
    key_name(&["restaurants_by_rating"])
}

pub fn weather(restaurant_id: &str) -> String {
    key_name(&["weather", restaurant_id])
}

pub fn restaurant_details(restaurant_id: &str) -> String {
    key_name(&["restaurant_details", restaurant_id])
}

pub fn duplicate_filter() -> String {
    key_name(&["bloom_restaurants"])
}

/// Match pattern for every canonical restaurant hash. The trailing colon in
/// the literal segment keeps sibling keys like `restaurants_by_cuisine` out.
pub fn restaurant_pattern() -> String {
    format!("{PREFIX}:restaurants:*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        assert_eq!(restaurant("abc12"), "bites:restaurants:abc12");
        assert_eq!(review_ledger("abc12"), "bites:reviews:abc12");
        assert_eq!(review_details("r1"), "bites:reviews_details:r1");
        assert_eq!(cuisine("italian"), "bites:cuisine:italian");
        assert_eq!(restaurant_cuisines("abc12"), "bites:restaurants_by_cuisine:abc12");
        assert_eq!(ratings(), "bites:restaurants_by_rating");
        assert_eq!(weather("abc12"), "bites:weather:abc12");
        assert_eq!(duplicate_filter(), "bites:bloom_restaurants");
    }

    #[test]
    fn test_pattern_excludes_siblings() {
        // Glob semantics: the literal "restaurants:" cannot match
        // "restaurants_by_cuisine:" or "restaurants_by_rating".
        assert_eq!(restaurant_pattern(), "bites:restaurants:*");
    }
}
