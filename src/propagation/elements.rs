//! Two-line element set text parsing

use std::path::Path;

use anyhow::{Context, Result};

/// Minimum length of a well-formed TLE data line
const TLE_LINE_LEN: usize = 69;

/// One element set as found in a TLE catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSet {
    pub norad_id: u32,
    pub name: String,
    pub line1: String,
    pub line2: String,
}

fn is_line1(line: &str) -> bool {
    line.starts_with("1 ") && line.len() >= TLE_LINE_LEN
}

fn is_line2(line: &str) -> bool {
    line.starts_with("2 ") && line.len() >= TLE_LINE_LEN
}

/// Parse 2-line or 3-line (name + 2 lines) TLE text.
///
/// Lines that do not form a valid pair are skipped. Element sets without a
/// name line are named after their catalog number.
pub fn parse_tle_text(text: &str) -> Vec<ElementSet> {
    let lines: Vec<&str> = text
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect();

    let mut sets = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line1 = lines[i];
        if !is_line1(line1) || i + 1 >= lines.len() || !is_line2(lines[i + 1]) {
            i += 1;
            continue;
        }
        let line2 = lines[i + 1];

        match line1.get(2..7).and_then(|s| s.trim().parse::<u32>().ok()) {
            Some(norad_id) => {
                let name = match i.checked_sub(1).map(|j| lines[j]) {
                    Some(prev) if !prev.starts_with("1 ") && !prev.starts_with("2 ") => {
                        prev.strip_prefix("0 ").unwrap_or(prev).trim().to_string()
                    }
                    _ => format!("NORAD {}", norad_id),
                };
                sets.push(ElementSet {
                    norad_id,
                    name,
                    line1: line1.to_string(),
                    line2: line2.to_string(),
                });
            }
            None => log::trace!("Skipping TLE with unreadable catalog number: {}", line1),
        }
        i += 2;
    }

    if sets.is_empty() && !lines.is_empty() {
        log::warn!("No element sets found in {} lines of TLE text", lines.len());
    }
    sets
}

/// Read element sets from a TLE text file
pub fn load_tle_file(path: impl AsRef<Path>) -> Result<Vec<ElementSet>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read TLE file: {:?}", path))?;
    let sets = parse_tle_text(&text);
    log::info!("Parsed {} element sets from {:?}", sets.len(), path);
    Ok(sets)
}
