use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub rows: Vec<T>,
    pub total_rows: i64,
    pub next_offset: Option<i64>,
    pub prev_offset: Option<i64>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        if rows.is_empty() {
            return Self::no_rows();
        }

        let next_offset = if current_offset + page_size < total_rows {
            Some(current_offset + page_size)
        } else {
            None
        };
        let prev_offset = if current_offset > 0 {
            Some((current_offset - page_size).max(0))
        } else {
            None
        };

        Self {
            rows,
            total_rows,
            next_offset,
            prev_offset,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            rows: vec![],
            total_rows: 0,
            next_offset: None,
            prev_offset: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page_links_both_ways() {
        let page = PageContext::from_rows(vec![1, 2, 3], 30, 10, 10);
        assert_eq!(page.next_offset, Some(20));
        assert_eq!(page.prev_offset, Some(0));
        assert_eq!(page.total_rows, 30);
    }

    #[test]
    fn first_and_last_pages_stop_at_the_edges() {
        let first = PageContext::from_rows(vec![1], 25, 10, 0);
        assert_eq!(first.prev_offset, None);
        assert_eq!(first.next_offset, Some(10));

        let last = PageContext::from_rows(vec![1], 25, 10, 20);
        assert_eq!(last.next_offset, None);
        assert_eq!(last.prev_offset, Some(10));
    }

    #[test]
    fn empty_result_has_no_links() {
        let page: PageContext<i32> = PageContext::from_rows(vec![], 0, 10, 0);
        assert_eq!(page.total_rows, 0);
        assert_eq!(page.next_offset, None);
        assert_eq!(page.prev_offset, None);
    }
}
