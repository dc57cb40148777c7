use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;

use crate::db::IndexRecord;

/// Document URLs for one destination grouping, in index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worklist {
    pub category: String,
    pub urls: Vec<String>,
}

/// Destination grouping for a tracked form type: the amendment suffix is
/// dropped, so "sc 13d/a" lands with "sc 13d".
pub fn group_name(form_type: &str) -> &str {
    form_type.strip_suffix("/a").unwrap_or(form_type)
}

pub fn document_url(archive_root: &str, document_path: &str) -> String {
    format!("{}{}", archive_root, document_path)
}

/// Project index records into per-category URL lists.
///
/// A record matches a tracked key only on exact (case-folded) equality with
/// its form type; the suffix rule applies to the output grouping alone.
/// Groups come back in the order their first tracked key was declared.
pub fn build_worklists(
    records: &[IndexRecord],
    tracked: &[String],
    archive_root: &str,
) -> Vec<Worklist> {
    let mut worklists: Vec<Worklist> = Vec::new();
    let mut route: HashMap<String, usize> = HashMap::new();

    for form in tracked {
        let key = form.to_lowercase();
        let group = group_name(&key).to_string();
        let idx = match worklists.iter().position(|w| w.category == group) {
            Some(idx) => idx,
            None => {
                worklists.push(Worklist {
                    category: group,
                    urls: Vec::new(),
                });
                worklists.len() - 1
            }
        };
        route.insert(key, idx);
    }

    let matched: Vec<(usize, String)> = records
        .par_iter()
        .filter_map(|r| {
            let idx = *route.get(&r.form_type.to_lowercase())?;
            Some((idx, document_url(archive_root, &r.document_path)))
        })
        .collect();

    for (idx, url) in matched {
        worklists[idx].urls.push(url);
    }
    worklists
}

/// Worklist entries whose URL is not yet in `scraped`, in worklist order.
/// Repeated entries are kept.
pub fn residual(worklist: &[String], scraped: &HashSet<String>) -> Vec<String> {
    worklist
        .par_iter()
        .filter(|url| !scraped.contains(url.as_str()))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryProgress {
    pub category: String,
    pub total: usize,
    pub completed: usize,
    pub residual: usize,
}

pub fn progress(worklists: &[Worklist], scraped: &HashSet<String>) -> Vec<CategoryProgress> {
    worklists
        .iter()
        .map(|w| {
            let remaining = residual(&w.urls, scraped).len();
            CategoryProgress {
                category: w.category.clone(),
                total: w.urls.len(),
                completed: w.urls.len() - remaining,
                residual: remaining,
            }
        })
        .collect()
}
