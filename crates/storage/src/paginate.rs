use crate::cursor::{Cursor, listing_order};
use crate::error::{Error, Result};
use common::config::PageSizes;
use common::{Article, FeedId, UserId};
use faststr::FastStr;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub user_id:     UserId,
    pub feed_ids:    Vec<FeedId>,
    // exclusive; `None` starts at the newest article
    pub before:      Option<Cursor>,
    pub unread_only: bool,
    pub fetch_limit: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Page {
    pub articles:    Vec<Article>,
    pub next_cursor: Option<FastStr>,
}

pub fn resolve_limit(requested: Option<usize>, sizes: PageSizes) -> Result<usize> {
    match requested {
        None => Ok(sizes.default),
        Some(0) => Err(Error::InvalidLimit(0)),
        Some(n) => Ok(n.min(sizes.max)),
    }
}

pub fn finish_page(mut rows: Vec<Article>, limit: usize) -> Page {
    debug_assert!(
        rows.windows(2).all(|w| listing_order(&w[0], &w[1]).is_lt()),
        "store returned rows out of listing order"
    );
    if rows.len() <= limit {
        return Page {
            articles:    rows,
            next_cursor: None,
        };
    }
    rows.truncate(limit);
    let next_cursor = rows.last().map(|last| Cursor::of(last).encode());
    Page {
        articles: rows,
        next_cursor,
    }
}

// Partitions may be unordered and may overlap the boundary.
pub fn merge_partitions<I>(partitions: I, before: Option<&Cursor>, fetch_limit: usize) -> Vec<Article>
where
    I: IntoIterator<Item = Vec<Article>>,
{
    let mut merged: Vec<Article> = partitions
        .into_iter()
        .flatten()
        .filter(|a| before.is_none_or(|b| Cursor::of(a).is_after(b)))
        .collect();
    merged.sort_unstable_by(listing_order);
    merged.dedup_by_key(|a| a.id);
    merged.truncate(fetch_limit);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn article(id: i64, feed_id: i64, secs: i64) -> Article {
        Article {
            id,
            feed_id,
            title: format!("article {id}").into(),
            url: None,
            published_at: Utc.timestamp_opt(secs, 0).unwrap(),
            read: false,
        }
    }

    fn ids(articles: &[Article]) -> Vec<i64> {
        articles.iter().map(|a| a.id).collect()
    }

    #[test]
    fn test_resolve_limit() {
        let sizes = PageSizes { default: 20, max: 100 };
        assert_eq!(resolve_limit(None, sizes).unwrap(), 20);
        assert_eq!(resolve_limit(Some(1), sizes).unwrap(), 1);
        assert_eq!(resolve_limit(Some(100), sizes).unwrap(), 100);
        assert_eq!(resolve_limit(Some(5000), sizes).unwrap(), 100);
        assert!(matches!(
            resolve_limit(Some(0), sizes),
            Err(Error::InvalidLimit(0))
        ));
    }

    #[test]
    fn test_finish_page_with_probe_row() {
        let rows = vec![article(5, 1, 50), article(4, 1, 40), article(3, 1, 30)];
        let page = finish_page(rows, 2);
        assert_eq!(ids(&page.articles), vec![5, 4]);

        let cursor = Cursor::decode(page.next_cursor.as_deref().unwrap()).unwrap();
        assert_eq!(cursor, Cursor::of(&article(4, 1, 40)));
    }

    #[test]
    fn test_finish_page_exact_fit_has_no_cursor() {
        let rows = vec![article(5, 1, 50), article(4, 1, 40)];
        let page = finish_page(rows, 2);
        assert_eq!(ids(&page.articles), vec![5, 4]);
        assert!(page.next_cursor.is_none());

        let page = finish_page(Vec::new(), 10);
        assert!(page.articles.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_merge_partitions_orders_and_bounds() {
        let feed_a = vec![article(1, 1, 10), article(6, 1, 60), article(4, 1, 40)];
        let feed_b = vec![article(5, 2, 40), article(2, 2, 20)];
        let empty_feed = Vec::new();

        let all = merge_partitions([feed_a.clone(), feed_b.clone(), empty_feed.clone()], None, 10);
        // id 5 and id 4 share a timestamp, the higher id comes first
        assert_eq!(ids(&all), vec![6, 5, 4, 2, 1]);

        let boundary = Cursor::of(&article(5, 2, 40));
        let rest = merge_partitions([feed_a, feed_b, empty_feed], Some(&boundary), 2);
        assert_eq!(ids(&rest), vec![4, 2]);
    }

    #[test]
    fn test_merge_partitions_drops_duplicates() {
        let a = vec![article(3, 1, 30), article(2, 1, 20)];
        let b = vec![article(3, 1, 30)];
        assert_eq!(ids(&merge_partitions([a, b], None, 10)), vec![3, 2]);
    }
}
