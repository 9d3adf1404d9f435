use crate::error::{Error, Result};
use csv::{ReaderBuilder, StringRecord};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::info;

pub const RECIPES_FILE: &str = "01_Recipe_Details.csv";
pub const INGREDIENTS_FILE: &str = "02_Ingredients.csv";
pub const COMPOUND_INGREDIENTS_FILE: &str = "03_Compound_Ingredients.csv";
pub const LINKS_FILE: &str = "04_Recipe-Ingredients_Aliases.csv";

/// Locations of the four source files of the published dataset.
#[derive(Debug, Clone)]
pub struct SourcePaths {
    pub recipes: PathBuf,
    pub ingredients: PathBuf,
    pub compound_ingredients: PathBuf,
    pub links: PathBuf,
}

impl SourcePaths {
    /// Resolve the canonical file names inside one directory.
    pub fn from_dir(dir: &Path) -> Self {
        SourcePaths {
            recipes: dir.join(RECIPES_FILE),
            ingredients: dir.join(INGREDIENTS_FILE),
            compound_ingredients: dir.join(COMPOUND_INGREDIENTS_FILE),
            links: dir.join(LINKS_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub cuisine: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Link {
    pub recipe_id: i64,
    pub ingredient: String,
    pub original: String,
}

/// Everything staged in memory, deduplicated and normalized, ready to load.
/// Ordered containers keep iteration (and so the load) deterministic.
#[derive(Debug, Default)]
pub struct Dataset {
    pub recipes: BTreeMap<i64, Recipe>,
    pub ingredients: BTreeSet<String>,
    pub links: BTreeSet<Link>,
}

/// Parse all four source files. The ingredient set is the union of both
/// ingredient files and every normalized name seen in the links file, so
/// the link table can never reference an ingredient that is missing.
pub fn read_all(paths: &SourcePaths) -> Result<Dataset> {
    let mut dataset = Dataset::default();

    read_recipes(&paths.recipes, &mut dataset.recipes)?;
    read_ingredient_names(&paths.compound_ingredients, &mut dataset.ingredients)?;
    read_ingredient_names(&paths.ingredients, &mut dataset.ingredients)?;
    read_links(&paths.links, &mut dataset.links, &mut dataset.ingredients)?;

    info!(
        "Staged {} recipes, {} ingredients, {} ingredient links",
        dataset.recipes.len(),
        dataset.ingredients.len(),
        dataset.links.len()
    );

    Ok(dataset)
}

/// Lowercase and trim an ingredient name. Ingredient names are join keys,
/// so they get the strictest normalization.
pub fn normalize_ingredient(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    // The dataset ships without header rows. flexible(true) lets short rows
    // through the parser so they can be reported with a column-level reason
    // instead of a generic record-length error.
    Ok(ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?)
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

fn malformed(path: &Path, line: u64, reason: String) -> Error {
    Error::MalformedRow {
        file: path.display().to_string(),
        line,
        reason,
    }
}

fn field<'r>(
    path: &Path,
    record: &'r StringRecord,
    index: usize,
    what: &str,
) -> Result<&'r str> {
    record.get(index).ok_or_else(|| {
        malformed(
            path,
            line_of(record),
            format!("missing {what} (column {index})"),
        )
    })
}

fn parse_id(path: &Path, record: &StringRecord, index: usize) -> Result<i64> {
    let raw = field(path, record, index, "recipe id")?;
    raw.trim().parse::<i64>().map_err(|_| {
        malformed(
            path,
            line_of(record),
            format!("recipe id {raw:?} is not an integer"),
        )
    })
}

/// Recipe rows: id in column 0, name in column 1, cuisine in column 3.
/// Exact duplicate rows are absorbed; two rows claiming the same id with
/// different details are a data bug and abort the run.
fn read_recipes(path: &Path, recipes: &mut BTreeMap<i64, Recipe>) -> Result<()> {
    info!("Reading recipes from {}", path.display());

    let mut reader = reader(path)?;
    for record in reader.records() {
        let record = record?;
        let id = parse_id(path, &record, 0)?;
        let name = field(path, &record, 1, "recipe name")?.to_lowercase();
        let cuisine = field(path, &record, 3, "cuisine")?.to_lowercase();

        if name.is_empty() {
            return Err(malformed(path, line_of(&record), "empty recipe name".into()));
        }
        if cuisine.is_empty() {
            return Err(malformed(path, line_of(&record), "empty cuisine".into()));
        }

        let recipe = Recipe { id, name, cuisine };
        match recipes.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(recipe);
            }
            Entry::Occupied(existing) => {
                if *existing.get() != recipe {
                    return Err(malformed(
                        path,
                        line_of(&record),
                        format!("conflicting duplicate for recipe id {id}"),
                    ));
                }
            }
        }
    }

    Ok(())
}

/// Plain and compound ingredient files share one shape: the name in column 0.
fn read_ingredient_names(path: &Path, ingredients: &mut BTreeSet<String>) -> Result<()> {
    info!("Reading ingredients from {}", path.display());

    let mut reader = reader(path)?;
    for record in reader.records() {
        let record = record?;
        let name = normalize_ingredient(field(path, &record, 0, "ingredient name")?);
        if name.is_empty() {
            return Err(malformed(
                path,
                line_of(&record),
                "empty ingredient name".into(),
            ));
        }
        ingredients.insert(name);
    }

    Ok(())
}

/// Link rows: recipe id in column 0, the original ingredient text in
/// column 1, the normalized name in column 2. The original text keeps its
/// whitespace (it is display data); the normalized name also joins the
/// ingredient set.
fn read_links(
    path: &Path,
    links: &mut BTreeSet<Link>,
    ingredients: &mut BTreeSet<String>,
) -> Result<()> {
    info!("Reading ingredient links from {}", path.display());

    let mut reader = reader(path)?;
    for record in reader.records() {
        let record = record?;
        let recipe_id = parse_id(path, &record, 0)?;
        let original = field(path, &record, 1, "original ingredient text")?.to_lowercase();
        let ingredient = normalize_ingredient(field(path, &record, 2, "normalized ingredient")?);

        if ingredient.is_empty() {
            return Err(malformed(
                path,
                line_of(&record),
                "empty normalized ingredient".into(),
            ));
        }

        ingredients.insert(ingredient.clone());
        links.insert(Link {
            recipe_id,
            ingredient,
            original,
        });
    }

    Ok(())
}
