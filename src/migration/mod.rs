//! JSON to PostgreSQL data migration
//!
//! - `migrate`: backs up the JSON collection files, then upserts every record
//!   into the target repositories collection by collection
//! - `verify`: compares the JSON files with the target and reports counts,
//!   missing or extra records and differing fields
//!
//! Both work against `Repositories`, so the target is normally PostgreSQL but
//! can be any backend.

pub mod migrate;
pub mod verify;

pub use migrate::{backup_collections, migrate, CollectionReport, MigrationReport};
pub use verify::{verify, CollectionDiff, VerifyReport};

/// Collections in migration order. Users come first so that activity and
/// version entries written afterwards refer to known accounts.
pub const COLLECTIONS: [&str; 8] = [
    "admin-users",
    "blog-posts",
    "properties",
    "testimonials",
    "newsletter-subscribers",
    "contact-messages",
    "activity-logs",
    "content-versions",
];

/// Render rows as a plain text table with a header rule
pub(crate) fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                if i == 0 {
                    format!("{:<width$}", cell, width = *width)
                } else {
                    format!("{:>width$}", cell, width = *width)
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = line(headers.to_vec());
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ActivityLog, AdminUser, BlogPost, ContactMessage, ContentVersion, NewsletterSubscriber,
        Property, Record, Testimonial,
    };

    #[test]
    fn test_collections_match_records() {
        let names = [
            AdminUser::COLLECTION,
            BlogPost::COLLECTION,
            Property::COLLECTION,
            Testimonial::COLLECTION,
            NewsletterSubscriber::COLLECTION,
            ContactMessage::COLLECTION,
            ActivityLog::COLLECTION,
            ContentVersion::COLLECTION,
        ];
        assert_eq!(names, COLLECTIONS);
    }

    #[test]
    fn test_render_table() {
        let table = render_table(
            &["Collection", "Read"],
            &[vec!["blog-posts".into(), "12".into()], vec!["users".into(), "3".into()]],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Collection  Read");
        assert_eq!(lines[1], "----------------");
        assert_eq!(lines[2], "blog-posts    12");
        assert_eq!(lines[3], "users          3");
    }
}
