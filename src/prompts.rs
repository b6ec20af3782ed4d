/// Placeholder shown in the empty composer.
pub const COMPOSER_PLACEHOLDER: &str = "List a few ingredients, e.g. chicken, rice, onion...";

/// Ingredient combos offered by `/suggest` and Ctrl+N.
pub const SUGGESTIONS: &[&str] = &[
    "chicken, rice, onion, garlic",
    "paneer, spinach, cream",
    "potatoes, cauliflower, peas",
    "chickpeas, tomatoes, ginger",
    "eggs, bread, green chilies",
    "red lentils, carrots, cumin",
];

/// Suggestion at `index`, wrapping around the list.
pub fn suggestion(index: usize) -> &'static str {
    SUGGESTIONS[index % SUGGESTIONS.len()]
}
