use crate::error::Result;
use std::env;

pub const DEFAULT_MAX_RESULTS: usize = 10_000;

/// Get the maximum results limit from environment variable or default
pub fn get_max_results() -> usize {
    env::var("CFEXPORT_MAX_RESULTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_RESULTS)
}

/// Fetch every page of an offset/limit listing
///
/// Stops on an empty or short page, or once [`get_max_results`] items have
/// been collected.
pub fn fetch_all_pages<T, F>(mut fetch_page: F, page_size: usize) -> Result<Vec<T>>
where
    F: FnMut(usize, usize) -> Result<Vec<T>>,
{
    let max_results = get_max_results();
    let mut all_results = Vec::new();
    let mut current_offset = 0;

    loop {
        let remaining = max_results.saturating_sub(all_results.len());
        if remaining == 0 {
            break;
        }

        let limit = std::cmp::min(page_size, remaining);
        let page_results = fetch_page(current_offset, limit)?;
        let page_len = page_results.len();

        if page_len == 0 {
            break;
        }

        all_results.extend(page_results);

        if all_results.len() >= max_results || page_len < limit {
            break;
        }

        current_offset += page_len;
    }

    Ok(all_results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;

    fn slice_fetcher(data: &[u32]) -> impl FnMut(usize, usize) -> Result<Vec<u32>> + '_ {
        move |offset, limit| Ok(data[offset.min(data.len())..].iter().copied().take(limit).collect())
    }

    #[test]
    fn single_short_page() {
        let data = [1, 2, 3];
        let result = fetch_all_pages(slice_fetcher(&data), 25).unwrap();
        assert_eq!(result, vec![1, 2, 3]);
    }

    #[test]
    fn children_spread_over_several_pages() {
        let data: Vec<u32> = (1..=60).collect();
        let mut offsets = Vec::new();
        let mut fetch = slice_fetcher(&data);

        let result = fetch_all_pages(
            |offset, limit| {
                offsets.push(offset);
                fetch(offset, limit)
            },
            25,
        )
        .unwrap();

        assert_eq!(result, data);
        assert_eq!(offsets, vec![0, 25, 50]);
    }

    #[test]
    fn exact_multiple_ends_on_empty_page() {
        let data: Vec<u32> = (1..=50).collect();
        let mut calls = 0;
        let mut fetch = slice_fetcher(&data);

        let result = fetch_all_pages(
            |offset, limit| {
                calls += 1;
                fetch(offset, limit)
            },
            25,
        )
        .unwrap();

        assert_eq!(result.len(), 50);
        assert_eq!(calls, 3);
    }

    #[test]
    fn empty_listing() {
        let result: Result<Vec<u32>> = fetch_all_pages(|_, _| Ok(vec![]), 25);
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn respects_max_results() {
        // CFEXPORT_MAX_RESULTS is not set in the test environment
        let data: Vec<u32> = (1..=(DEFAULT_MAX_RESULTS as u32 + 500)).collect();
        let result = fetch_all_pages(slice_fetcher(&data), 1000).unwrap();
        assert_eq!(result.len(), DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn propagates_error_from_later_page() {
        let mut call_count = 0;
        let result: Result<Vec<u32>> = fetch_all_pages(
            |_, _| {
                call_count += 1;
                if call_count == 1 {
                    Ok(vec![1, 2, 3, 4, 5])
                } else {
                    Err(ExportError::Api {
                        status: 500,
                        message: "Server error".to_string(),
                    })
                }
            },
            5,
        );

        assert!(matches!(result, Err(ExportError::Api { status: 500, .. })));
    }
}
