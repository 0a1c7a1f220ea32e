//! Shopping-aisle classification by keyword containment.
//!
//! Buckets are checked in a fixed priority order so compound terms
//! ("onion powder", "canned tomatoes") land in the specific bucket before
//! the generic produce keyword can claim them. Within a bucket the longest
//! keyword is tried first.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientCategory {
    Spices,
    Canned,
    Condiments,
    Dairy,
    MeatSeafood,
    Bakery,
    Frozen,
    Beverages,
    Pantry,
    Produce,
    #[default]
    Other,
}

impl IngredientCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngredientCategory::Spices => "spices",
            IngredientCategory::Canned => "canned",
            IngredientCategory::Condiments => "condiments",
            IngredientCategory::Dairy => "dairy",
            IngredientCategory::MeatSeafood => "meat_seafood",
            IngredientCategory::Bakery => "bakery",
            IngredientCategory::Frozen => "frozen",
            IngredientCategory::Beverages => "beverages",
            IngredientCategory::Pantry => "pantry",
            IngredientCategory::Produce => "produce",
            IngredientCategory::Other => "other",
        }
    }
}

// A leading space anchors a keyword to a word start (" salt" skips "unsalted"),
// a trailing one to a word end (" tea " skips "teaspoon").
const SPICES: &[&str] = &[
    "onion powder",
    "garlic powder",
    "chili powder",
    "curry powder",
    "ground ginger",
    "ground cloves",
    "ground coriander",
    "ground cinnamon",
    "coriander seed",
    "mustard seed",
    "fennel seed",
    "cumin",
    "paprika",
    "cinnamon",
    "nutmeg",
    "oregano",
    "turmeric",
    "cayenne",
    "allspice",
    "cardamom",
    "garam masala",
    "italian seasoning",
    "seasoning",
    "red pepper flakes",
    "chili flakes",
    "black pepper",
    "white pepper",
    "peppercorn",
    "bay leaf",
    "bay leaves",
    "dried basil",
    "dried thyme",
    "dried parsley",
    "dried rosemary",
    " salt",
];

const CANNED: &[&str] = &[
    "canned",
    "tinned",
    "tomato paste",
    "tomato sauce",
    "crushed tomatoes",
    "diced tomatoes",
    "coconut milk",
    "chickpeas",
    "black beans",
    "kidney beans",
    "cannellini",
    "broth",
    "stock",
];

const CONDIMENTS: &[&str] = &[
    "peanut butter",
    "soy sauce",
    "fish sauce",
    "hot sauce",
    "worcestershire",
    "sriracha",
    "ketchup",
    "mustard",
    "mayonnaise",
    "mayo",
    "vinegar",
    "salsa",
    "pesto",
    "honey",
    "maple syrup",
    "jam",
    "relish",
];

const DAIRY: &[&str] = &[
    "butter",
    "milk",
    "cream",
    "cheese",
    "parmesan",
    "mozzarella",
    "cheddar",
    "ricotta",
    "yogurt",
    "yoghurt",
    "sour cream",
    "buttermilk",
    " egg ",
    " eggs",
    "egg yolk",
    "egg white",
];

const MEAT_SEAFOOD: &[&str] = &[
    "chicken",
    "beef",
    "pork",
    "lamb",
    "turkey",
    "bacon",
    "sausage",
    " ham ",
    " hams ",
    "steak",
    "ground meat",
    "salmon",
    "tuna",
    "shrimp",
    "prawn",
    "cod",
    "fish",
    "crab",
    "scallop",
    "anchov",
];

const BAKERY: &[&str] = &[
    "bread",
    "baguette",
    " bun ",
    " buns",
    " roll ",
    " rolls",
    "tortilla",
    "pita",
    "naan",
    "croissant",
    "bagel",
    "breadcrumbs",
];

const FROZEN: &[&str] = &["frozen", "ice cream", "puff pastry"];

const BEVERAGES: &[&str] = &[
    "wine",
    "beer",
    "coffee",
    "espresso",
    " tea ",
    " teas ",
    "juice",
    "soda",
    "sparkling water",
];

const PANTRY: &[&str] = &[
    "flour",
    "sugar",
    "baking powder",
    "baking soda",
    "yeast",
    "cornstarch",
    "vanilla",
    "cocoa",
    "chocolate",
    "oil",
    "rice",
    "pasta",
    "spaghetti",
    "noodle",
    "oats",
    "crackers",
    "quinoa",
    "lentil",
    "almond",
    "walnut",
    "pecan",
    "raisin",
    "sesame",
    "breadcrumb",
];

const PRODUCE: &[&str] = &[
    "onion",
    "garlic",
    "tomato",
    "potato",
    "carrot",
    "celery",
    "pepper",
    "lettuce",
    "spinach",
    "kale",
    "cabbage",
    "broccoli",
    "cauliflower",
    "zucchini",
    "eggplant",
    "mushroom",
    "cucumber",
    "avocado",
    "lemon",
    "lime",
    "orange",
    "apple",
    "banana",
    "berries",
    "strawberr",
    "blueberr",
    "ginger",
    "basil",
    "parsley",
    "cilantro",
    "thyme",
    "rosemary",
    "mint",
    "scallion",
    "shallot",
    "leek",
];

/// Buckets in priority order, each sorted longest keyword first.
static BUCKETS: LazyLock<Vec<(IngredientCategory, Vec<&'static str>)>> = LazyLock::new(|| {
    [
        (IngredientCategory::Spices, SPICES),
        (IngredientCategory::Canned, CANNED),
        (IngredientCategory::Condiments, CONDIMENTS),
        (IngredientCategory::Dairy, DAIRY),
        (IngredientCategory::MeatSeafood, MEAT_SEAFOOD),
        (IngredientCategory::Bakery, BAKERY),
        (IngredientCategory::Frozen, FROZEN),
        (IngredientCategory::Beverages, BEVERAGES),
        (IngredientCategory::Pantry, PANTRY),
        (IngredientCategory::Produce, PRODUCE),
    ]
    .into_iter()
    .map(|(category, keywords)| {
        let mut keywords = keywords.to_vec();
        keywords.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        (category, keywords)
    })
    .collect()
});

/// Classify an ingredient into a shopping category. No match is `Other`.
pub fn classify(text: &str) -> IngredientCategory {
    let padded = format!(" {} ", text.trim().to_lowercase());

    for (category, keywords) in BUCKETS.iter() {
        if keywords.iter().any(|keyword| padded.contains(keyword)) {
            return *category;
        }
    }

    IngredientCategory::Other
}
