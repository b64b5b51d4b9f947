//! Collecting the ids to import from arguments, files and ranges.

use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use wbimport_model::EntityId;

/// Ids listed one per line; blank lines and `#` comments are ignored.
pub fn read_id_file(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read id list {}", path.display()))?;
    Ok(parse_id_lines(&contents))
}

pub fn parse_id_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Longest range `expand_range` accepts.
pub const MAX_RANGE_LEN: u64 = 100_000;

/// Expand `Q1:Q20` into every id in between, bounds included.
pub fn expand_range(range: &str) -> Result<Vec<String>> {
    let (start, end) = range
        .split_once(':')
        .ok_or_else(|| anyhow!("range {range:?} must look like Q1:Q20"))?;
    let start = EntityId::parse(start.trim()).with_context(|| format!("invalid range start in {range:?}"))?;
    let end = EntityId::parse(end.trim()).with_context(|| format!("invalid range end in {range:?}"))?;

    if start.kind() != end.kind() {
        bail!("range {range:?} mixes entity kinds");
    }
    if start.number() > end.number() {
        bail!("range {range:?} is empty");
    }
    let len = end.number() - start.number() + 1;
    if len > MAX_RANGE_LEN {
        bail!("range {range:?} spans {len} ids, at most {MAX_RANGE_LEN} are allowed; split it or use --file");
    }
    Ok((start.number()..=end.number())
        .map(|n| EntityId::new(start.kind(), n).to_string())
        .collect())
}
