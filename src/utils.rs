use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Component, Path, PathBuf};

use failure::{format_err, ResultExt};
use zip::ZipArchive;

use crate::errors::*;

pub type IntentName = String;
pub type SlotName = String;
pub type EntityName = String;

/// Open-interval overlap between two half-open ranges
pub fn ranges_overlap(lhs: &Range<usize>, rhs: &Range<usize>) -> bool {
    lhs.start < rhs.end && lhs.end > rhs.start
}

pub fn substring_with_char_range(text: &str, range: &Range<usize>) -> String {
    text.chars()
        .skip(range.start)
        .take(range.end.saturating_sub(range.start))
        .collect()
}

pub fn deduplicate_overlapping_items<I, O, S, K>(
    items: Vec<I>,
    overlap: O,
    sort_key_fn: S,
) -> Vec<I>
where
    O: Fn(&I, &I) -> bool,
    S: FnMut(&I) -> K,
    K: Ord,
{
    let mut sorted_items = items;
    sorted_items.sort_by_key(sort_key_fn);
    let mut deduplicated_items: Vec<I> = Vec::with_capacity(sorted_items.len());
    for item in sorted_items {
        if !deduplicated_items
            .iter()
            .any(|dedup_item| overlap(dedup_item, &item))
        {
            deduplicated_items.push(item);
        }
    }
    deduplicated_items
}

pub fn extract_zip_archive<R: io::Read + io::Seek>(zip_reader: R, dest_path: &Path) -> Result<PathBuf> {
    let mut archive =
        ZipArchive::new(zip_reader).with_context(|_| "Could not read parser zip data")?;
    for file_index in 0..archive.len() {
        let mut file = archive.by_index(file_index)?;
        let relative_path = file
            .enclosed_name()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| format_err!("Unsafe path in parser archive: '{}'", file.name()))?;
        let outpath = dest_path.join(relative_path);

        if file.name().ends_with('/') || file.name().ends_with('\\') {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(p) = outpath.parent() {
                if !p.exists() {
                    fs::create_dir_all(&p)?;
                }
            }
            let mut outfile = fs::File::create(&outpath)?;
            io::copy(&mut file, &mut outfile)?;
        }
    }
    if archive.len() == 0 {
        return Err(format_err!("Parser archive is empty"));
    }
    let first_archive_file = archive
        .by_index(0)?
        .enclosed_name()
        .map(|p| p.to_path_buf())
        .ok_or_else(|| format_err!("Parser archive is incorrect"))?;
    let parser_dir_name = first_archive_file
        .components()
        .find(|component| matches!(component, Component::Normal(_)))
        .ok_or_else(|| format_err!("Parser archive is incorrect"))?
        .as_os_str()
        .to_owned();
    Ok(dest_path.join(parser_dir_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_overlap_works() {
        assert!(ranges_overlap(&(0..3), &(2..6)));
        assert!(!ranges_overlap(&(0..3), &(3..6)));
        assert!(!ranges_overlap(&(5..6), &(0..3)));
    }

    #[test]
    fn deduplicate_items_works() {
        // Given
        let items = vec![0..3, 4..8, 0..8, 9..13];

        fn sort_key(rng: &Range<usize>) -> i32 {
            -(rng.clone().count() as i32)
        }

        // When
        let mut dedup_items = deduplicate_overlapping_items(items, ranges_overlap, sort_key);
        dedup_items.sort_by_key(|item| item.start);

        // Then
        let expected_items = vec![0..8, 9..13];
        assert_eq!(expected_items, dedup_items);
    }

    #[test]
    fn substring_with_char_range_works() {
        // Given
        let text = "Fïnd ä flïght";

        // When
        let substring = substring_with_char_range(text, &(5..13));

        // Then
        assert_eq!("ä flïght", substring);
    }
}
