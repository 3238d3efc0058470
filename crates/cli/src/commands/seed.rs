//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! categories:
//!   - name: Tea
//!     description: Loose leaf
//!     products:
//!       - name: Sencha
//!         price: "4.50"
//!       - name: Genmaicha
//!         price: 3.75
//!         image_url: https://cdn.example.com/genmaicha.jpg
//! ```
//!
//! Every entry goes through the same validation as the admin endpoints, and
//! the whole file is validated before anything is written.

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use shopfloor_api::db::PgStore;
use shopfloor_api::services::{CatalogError, CatalogService, CategoryDraft, ProductDraft};
use shopfloor_core::Price;

use super::CommandError;

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid catalog file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Top level of a catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub categories: Vec<CategoryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ProductEntry {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
}

/// What a seed run inserted.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub products: usize,
}

/// Problems in a catalog file that would make the API reject an entry.
#[must_use]
pub fn validate(file: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();

    for (i, category) in file.categories.iter().enumerate() {
        if category.name.trim().is_empty() {
            errors.push(format!("categories[{i}]: name is blank"));
        }
        for (j, product) in category.products.iter().enumerate() {
            if product.name.trim().is_empty() {
                errors.push(format!("categories[{i}].products[{j}]: name is blank"));
            }
            if let Err(e) = Price::new(product.price) {
                errors.push(format!("categories[{i}].products[{j}]: {e}"));
            }
        }
    }

    errors
}

/// Parse and validate a catalog file without touching the database.
pub fn parse(content: &str) -> Result<CatalogFile, SeedError> {
    let file: CatalogFile = serde_yaml::from_str(content)?;

    let errors = validate(&file);
    if !errors.is_empty() {
        tracing::error!("Catalog validation failed:");
        for err in &errors {
            tracing::error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }

    Ok(file)
}

/// Insert every category and product in `file_path`.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the file cannot be read
/// or fails validation, or an insert fails.
pub async fn catalog(file_path: &str) -> Result<SeedSummary, SeedError> {
    let database_url = super::database_url()?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_owned()));
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    let file = parse(&content)?;
    info!(categories = file.categories.len(), "Catalog validated");

    let timeout = Duration::from_secs(10);
    let pool = shopfloor_api::db::create_pool(&database_url, timeout).await?;
    let store = PgStore::new(pool, timeout);
    let catalog = CatalogService::new(&store);

    let mut summary = SeedSummary::default();
    for entry in file.categories {
        let category = catalog
            .create_category(CategoryDraft {
                name: entry.name,
                description: entry.description,
                image_url: entry.image_url,
            })
            .await?;
        summary.categories += 1;
        info!(id = %category.id, name = %category.name, "Category created");

        for product in entry.products {
            catalog
                .create_product(ProductDraft {
                    name: product.name,
                    description: product.description,
                    price: product.price,
                    image_url: product.image_url,
                    category_id: category.id,
                })
                .await?;
            summary.products += 1;
        }
    }

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
categories:
  - name: Tea
    description: Loose leaf
    products:
      - name: Sencha
        price: "4.50"
      - name: Genmaicha
        price: 3.75
        image_url: https://cdn.example.com/genmaicha.jpg
  - name: Teaware
"#;

    #[test]
    fn test_parse_sample() {
        let file = parse(SAMPLE).unwrap();
        assert_eq!(file.categories.len(), 2);

        let tea = &file.categories[0];
        assert_eq!(tea.products.len(), 2);
        assert_eq!(tea.products[0].price, Decimal::new(450, 2));
        assert_eq!(tea.products[1].price, Decimal::new(375, 2));
        assert!(file.categories[1].products.is_empty());
    }

    #[test]
    fn test_rejects_bad_entries() {
        let yaml = r#"
categories:
  - name: "  "
    products:
      - name: Free
        price: 0
      - name: Fine
        price: "1.001"
"#;
        let file: CatalogFile = serde_yaml::from_str(yaml).unwrap();
        let errors = validate(&file);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("categories[0]: name is blank"));

        assert!(matches!(parse(yaml), Err(SeedError::Invalid(3))));
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        assert!(matches!(
            parse("categories: [{ name: Tea, products: [{ name: X }] }]"),
            Err(SeedError::Yaml(_))
        ));
    }
}
