pub const RECIPE_COUNT_PER_PAGE: i64 = 10;
pub const SUBSCRIPTION_COUNT_PER_PAGE: i64 = 10;

/// Recipes shown per followed author unless the caller passes `recipes_limit`.
pub const DEFAULT_RECIPES_LIMIT: i64 = 3;

pub const SESSION_LIFETIME_HOURS: i64 = 1;

pub const SHOPPING_LIST_HEADER: &str = "Shopping list:";
pub const SHOPPING_LIST_FILE_NAME: &str = "shopping_list.txt";

pub const RECIPE_ORDERS: &[(&str, &str)] = &[
    ("newest", "Newest first"),
    ("alphabetical", "Alphabetical"),
];
