//! Countries every installation starts with.

use crate::regions::{Country, CountryRepository};
use std::sync::Arc;
use whippet_core::environment::Clock;
use whippet_core::result::WhippetResult;

/// Default countries as `(abbreviation, name)`, ISO 3166-1 alpha-2.
pub const DEFAULT_COUNTRIES: &[(&str, &str)] = &[
    ("AR", "Argentina"),
    ("AU", "Australia"),
    ("AT", "Austria"),
    ("BE", "Belgium"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CL", "Chile"),
    ("CN", "China"),
    ("CO", "Colombia"),
    ("DK", "Denmark"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("DE", "Germany"),
    ("IN", "India"),
    ("IE", "Ireland"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("MX", "Mexico"),
    ("NL", "Netherlands"),
    ("NZ", "New Zealand"),
    ("NO", "Norway"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("KR", "South Korea"),
    ("ES", "Spain"),
    ("SE", "Sweden"),
    ("CH", "Switzerland"),
    ("GB", "United Kingdom"),
    ("US", "United States"),
];

/// Inserts the [`DEFAULT_COUNTRIES`] missing from the repository.
#[derive(Debug)]
pub struct CountrySeeder<R, C> {
    countries: Arc<R>,
    clock: C,
}

impl<R: CountryRepository, C: Clock> CountrySeeder<R, C> {
    /// Create a seeder writing to `countries`.
    #[must_use]
    pub const fn new(countries: Arc<R>, clock: C) -> Self {
        Self { countries, clock }
    }

    /// Insert every default country not already present by abbreviation.
    ///
    /// Returns how many countries were created; a second run returns zero.
    ///
    /// # Errors
    ///
    /// Returns the first repository failure. Countries inserted before it
    /// stay in place.
    pub async fn seed(&self) -> WhippetResult<usize> {
        let mut created = 0;
        for (abbreviation, name) in DEFAULT_COUNTRIES {
            if self.countries.get_by_abbreviation(abbreviation).await?.is_some() {
                continue;
            }
            self.countries
                .create(Country::new(*name, *abbreviation, &self.clock))
                .await?;
            created += 1;
        }

        tracing::info!(created, total = DEFAULT_COUNTRIES.len(), "Countries seeded");
        Ok(created)
    }
}

#[cfg(all(test, feature = "test-utils"))]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;
    use whippet_core::repository::Entity;
    use whippet_testing::{InMemoryRepository, test_clock};

    #[test]
    fn default_countries_are_valid_and_distinct() {
        let clock = test_clock();
        let mut codes: Vec<_> = DEFAULT_COUNTRIES.iter().map(|(code, _)| *code).collect();
        for (abbreviation, name) in DEFAULT_COUNTRIES {
            assert_eq!(Country::new(*name, *abbreviation, &clock).validate(), Ok(()));
        }
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), DEFAULT_COUNTRIES.len());
    }

    #[tokio::test]
    async fn keeps_existing_countries_and_is_rerunnable() {
        let clock = test_clock();
        let countries = Arc::new(InMemoryRepository::with_rows([Country::new(
            "Canada (custom)",
            "ca",
            &clock,
        )]));
        let seeder = CountrySeeder::new(Arc::clone(&countries), clock);

        assert_eq!(seeder.seed().await.unwrap(), DEFAULT_COUNTRIES.len() - 1);
        assert_eq!(seeder.seed().await.unwrap(), 0);

        let rows = countries.snapshot();
        assert_eq!(rows.len(), DEFAULT_COUNTRIES.len());
        assert!(rows.iter().any(|country| country.name == "Canada (custom)"));
    }
}
