// Canonical per-book metadata as returned by the audnex catalog, plus the
// naming rules downstream library scanners key off.

pub mod opf;
pub mod probe;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An author or narrator credit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asin: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub name: String,
    #[serde(default)]
    pub asin: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// The canonical per-book record from the catalog
///
/// A record with an empty ASIN is never treated as a successful lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookMetadata {
    pub asin: String,
    pub authors: Vec<Person>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<i32>,
    pub description: String,
    pub format_type: String,
    pub genres: Vec<Genre>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_adult: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literature_type: Option<String>,
    pub narrators: Vec<Person>,
    pub publisher_name: String,
    pub rating: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<DateTime<Utc>>,
    #[serde(rename = "runtimeLengthMin")]
    pub runtime_length_min: i64,
    #[serde(rename = "seriesPrimary", skip_serializing_if = "Option::is_none")]
    pub primary_series: Option<Series>,
    #[serde(rename = "seriesSecondary", skip_serializing_if = "Option::is_none")]
    pub secondary_series: Option<Series>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub summary: String,
    pub title: String,
}

impl BookMetadata {
    /// Canonical directory name for this book.
    ///
    /// `<Title>[ - <Series>[ - Book <Position>]]`. Pure function of the
    /// record; slash replacement is applied separately by the importer.
    pub fn directory_name(&self) -> String {
        let mut name = self.title.clone();

        if let Some(series) = &self.primary_series {
            name.push_str(" - ");
            name.push_str(&series.name);

            if let Some(position) = &series.position {
                name.push_str(" - Book ");
                name.push_str(position);
            }
        }

        name
    }

    /// Human-readable one-line summary used when multiple catalog matches
    /// need manual selection
    pub fn summarize(&self) -> String {
        let truncated_title = if self.title.chars().count() > 80 {
            let mut short: String = self.title.chars().take(77).collect();
            short.push_str("...");
            short
        } else {
            self.title.clone()
        };

        if self.authors.is_empty() {
            return truncated_title;
        }

        let mut buffer = truncated_title;
        buffer.push_str(" by ");
        buffer.push_str(&self.authors[0].name);

        for author in &self.authors[1..] {
            buffer.push_str(" & ");
            buffer.push_str(&author.name);
        }

        if let Some(series) = &self.primary_series {
            buffer.push_str(" - ");
            buffer.push_str(&series.name);

            if let Some(position) = &series.position {
                buffer.push(' ');
                buffer.push_str(position);
            }
        }

        buffer.push_str(&format!(" (ASIN: {})", self.asin));

        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(title: &str) -> BookMetadata {
        BookMetadata {
            asin: "B012345678".to_string(),
            title: title.to_string(),
            authors: vec![Person {
                name: "Alice".to_string(),
                asin: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn directory_name_title_only() {
        assert_eq!(book("Foo").directory_name(), "Foo");
    }

    #[test]
    fn directory_name_with_series_and_position() {
        let mut md = book("Bar");
        md.primary_series = Some(Series {
            name: "S".to_string(),
            asin: None,
            position: Some("2".to_string()),
        });
        assert_eq!(md.directory_name(), "Bar - S - Book 2");
    }

    #[test]
    fn directory_name_with_series_without_position() {
        let mut md = book("Bar");
        md.primary_series = Some(Series {
            name: "S".to_string(),
            asin: None,
            position: None,
        });
        assert_eq!(md.directory_name(), "Bar - S");
    }

    #[test]
    fn directory_name_is_deterministic() {
        let md = book("Foo");
        assert_eq!(md.directory_name(), md.directory_name());
    }

    #[test]
    fn summarize_joins_authors_and_series() {
        let mut md = book("Foo");
        md.authors.push(Person {
            name: "Bob".to_string(),
            asin: None,
        });
        md.primary_series = Some(Series {
            name: "S".to_string(),
            asin: None,
            position: Some("2".to_string()),
        });
        assert_eq!(md.summarize(), "Foo by Alice & Bob - S 2 (ASIN: B012345678)");
    }

    #[test]
    fn summarize_truncates_long_titles() {
        let long_title = "x".repeat(100);
        let md = book(&long_title);
        let summary = md.summarize();
        let expected_prefix = format!("{}...", "x".repeat(77));
        assert!(summary.starts_with(&expected_prefix));
        assert!(!summary.starts_with(&"x".repeat(81)));
    }

    #[test]
    fn summarize_without_authors_is_title_only() {
        let mut md = book("Foo");
        md.authors.clear();
        assert_eq!(md.summarize(), "Foo");
    }

    #[test]
    fn audnex_response_deserializes() {
        let json = r#"{
            "asin": "B09B8V1LDT",
            "authors": [{"name": "Andy Weir"}],
            "description": "A lone astronaut.",
            "formatType": "unabridged",
            "genres": [{"name": "Science Fiction", "asin": "18580606011", "type": "genre"}],
            "language": "english",
            "narrators": [{"name": "Ray Porter"}],
            "publisherName": "Audible Studios",
            "rating": "4.8",
            "region": "us",
            "releaseDate": "2021-05-04T00:00:00Z",
            "runtimeLengthMin": 970,
            "seriesPrimary": {"name": "Hail Mary", "position": "1"},
            "summary": "A lone astronaut.",
            "title": "Project Hail Mary"
        }"#;

        let md: BookMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(md.asin, "B09B8V1LDT");
        assert_eq!(md.authors[0].name, "Andy Weir");
        assert_eq!(md.narrators[0].name, "Ray Porter");
        assert_eq!(md.runtime_length_min, 970);
        assert_eq!(md.primary_series.as_ref().unwrap().position.as_deref(), Some("1"));
        assert!(md.isbn.is_none());
    }
}
