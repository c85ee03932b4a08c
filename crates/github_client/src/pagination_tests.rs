//! Tests for pagination accumulation.

use super::*;
use std::sync::{Arc, Mutex};

fn numbered(start: usize, count: usize) -> Vec<usize> {
    (start..start + count).collect()
}

#[tokio::test]
async fn test_three_pages_accumulate_every_node() {
    let requested_cursors = Arc::new(Mutex::new(Vec::new()));
    let recorder = requested_cursors.clone();

    let nodes = collect_all_pages(move |cursor| {
        recorder.lock().unwrap().push(cursor.clone());
        async move {
            Ok(match cursor.as_deref() {
                None => Page::with_next(numbered(0, 100), "cursor-1"),
                Some("cursor-1") => Page::with_next(numbered(100, 100), "cursor-2"),
                Some("cursor-2") => Page::last(numbered(200, 7)),
                Some(other) => panic!("unexpected cursor {other}"),
            })
        }
    })
    .await
    .expect("pagination should succeed");

    assert_eq!(nodes.len(), 207);
    assert_eq!(nodes.first(), Some(&0));
    assert_eq!(nodes.last(), Some(&206));
    assert_eq!(
        *requested_cursors.lock().unwrap(),
        vec![
            None,
            Some("cursor-1".to_string()),
            Some("cursor-2".to_string())
        ]
    );
}

#[tokio::test]
async fn test_single_empty_page() {
    let nodes: Vec<u8> = collect_all_pages(|_| async { Ok(Page::last(Vec::new())) })
        .await
        .expect("pagination should succeed");

    assert!(nodes.is_empty());
}

#[tokio::test]
async fn test_error_on_later_page_discards_partial_result() {
    let result: Result<Vec<usize>, Error> = collect_all_pages(|cursor| async move {
        match cursor {
            None => Ok(Page::with_next(numbered(0, 100), "cursor-1")),
            Some(_) => Err(Error::RateLimitExceeded),
        }
    })
    .await;

    assert!(matches!(result, Err(Error::RateLimitExceeded)));
}

#[tokio::test]
async fn test_next_page_without_cursor_is_invalid() {
    let result: Result<Vec<usize>, Error> = collect_all_pages(|_| async {
        Ok(Page {
            nodes: vec![1],
            has_next_page: true,
            end_cursor: None,
        })
    })
    .await;

    assert!(matches!(result, Err(Error::InvalidResponse(_))));
}
