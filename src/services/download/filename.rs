//! Descriptive filenames for downloaded flyers.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::models::FlyerDescriptor;

/// `<store>_<type>[_<KWnn|Month>][_<year>].pdf`.
pub fn build_filename(store: &str, descriptor: &FlyerDescriptor) -> String {
    let mut parts = vec![
        sanitize_component(store),
        descriptor.flyer_type.file_token().to_string(),
    ];
    if let Some(period) = descriptor.period_token() {
        parts.push(period);
    }
    if let Some(year) = descriptor.year {
        parts.push(year.to_string());
    }
    format!("{}.pdf", parts.join("_"))
}

/// Replace characters that are unsafe in filenames and spaces with `_`.
pub fn sanitize_component(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' | ' ' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = sanitized.trim_matches('_');
    if trimmed.is_empty() {
        "Prospekt".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Hands out filenames that are unique within a run and on disk.
#[derive(Debug)]
pub struct FilenameAllocator {
    dir: PathBuf,
    used: HashSet<String>,
}

impl FilenameAllocator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            used: HashSet::new(),
        }
    }

    /// Reserve `base`, or `base` with `_2`, `_3`, ... before the extension.
    pub fn allocate(&mut self, base: &str) -> String {
        let (stem, ext) = split_extension(base);
        let mut candidate = base.to_string();
        let mut n = 2;
        while self.is_taken(&candidate) {
            candidate = format!("{}_{}{}", stem, n, ext);
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }

    fn is_taken(&self, name: &str) -> bool {
        self.used.contains(name) || self.dir.join(name).exists()
    }
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}
