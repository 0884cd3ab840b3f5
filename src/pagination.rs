/// One page of an ordered collection, with the metadata needed to
/// render navigation controls.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

/// Slices `items` into the 1-indexed `page` of size `per_page`.
///
/// Pages below 1 are treated as page 1; pages past the end yield an
/// empty slice but keep the metadata valid.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let page = page.max(1);
    let total = items.len();
    let start = (page - 1).saturating_mul(per_page);
    let items = items.into_iter().skip(start).take(per_page).collect();
    Page {
        items,
        page,
        per_page,
        total,
    }
}

impl<T> Page<T> {
    pub fn pages(&self) -> usize {
        if self.per_page == 0 {
            return 0;
        }
        (self.total + self.per_page - 1) / self.per_page
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages()
    }

    pub fn prev_num(&self) -> Option<usize> {
        self.has_prev().then(|| self.page - 1)
    }

    pub fn next_num(&self) -> Option<usize> {
        self.has_next().then(|| self.page + 1)
    }

    /// Page numbers for navigation controls; `None` marks a collapsed
    /// gap. Always keeps the first `left_edge` and last `right_edge`
    /// pages plus a window of `left_current` before and `right_current`
    /// after the current page.
    pub fn iter_pages(
        &self,
        left_edge: usize,
        left_current: usize,
        right_current: usize,
        right_edge: usize,
    ) -> PageWindow {
        PageWindow {
            num: 1,
            last: 0,
            pending: None,
            pages: self.pages(),
            page: self.page,
            left_edge,
            left_current,
            right_current,
            right_edge,
        }
    }
}

pub struct PageWindow {
    num: usize,
    last: usize,
    pending: Option<usize>,
    pages: usize,
    page: usize,
    left_edge: usize,
    left_current: usize,
    right_current: usize,
    right_edge: usize,
}

impl Iterator for PageWindow {
    type Item = Option<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(num) = self.pending.take() {
            self.last = num;
            return Some(Some(num));
        }
        while self.num <= self.pages {
            let num = self.num;
            self.num += 1;
            let in_window = num <= self.left_edge
                || (num + self.left_current >= self.page && num < self.page + self.right_current)
                || num > self.pages.saturating_sub(self.right_edge);
            if !in_window {
                continue;
            }
            if self.last != 0 && self.last + 1 != num {
                self.pending = Some(num);
                return Some(None);
            }
            self.last = num;
            return Some(Some(num));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_ten_items_over_two_pages_of_nine() {
        let items: Vec<usize> = (0..10).collect();
        let first = paginate(items.clone(), 1, 9);
        assert_eq!(first.items.len(), 9);
        assert_eq!(first.pages(), 2);
        assert!(first.has_next());
        assert!(!first.has_prev());
        assert_eq!(first.next_num(), Some(2));

        let second = paginate(items, 2, 9);
        assert_eq!(second.items, vec![9]);
        assert!(!second.has_next());
        assert_eq!(second.prev_num(), Some(1));
    }

    #[test]
    fn concatenating_pages_reproduces_the_collection() {
        let items: Vec<usize> = (0..23).collect();
        let per_page = 5;
        let pages = paginate(items.clone(), 1, per_page).pages();
        assert_eq!(pages, 5);
        let mut collected = Vec::new();
        for page in 1..=pages {
            collected.extend(paginate(items.clone(), page, per_page).items);
        }
        assert_eq!(collected, items);
    }

    #[test]
    fn page_below_one_is_page_one() {
        let page = paginate(vec![1, 2, 3], 0, 2);
        assert_eq!(page.page, 1);
        assert_eq!(page.items, vec![1, 2]);
    }

    #[test]
    fn overflow_page_is_empty_with_valid_metadata() {
        let page = paginate(vec![1, 2, 3], 7, 2);
        assert!(page.items.is_empty());
        assert_eq!(page.pages(), 2);
        assert!(!page.has_next());
        assert!(page.has_prev());
    }

    #[test]
    fn zero_per_page_means_zero_pages() {
        let page = paginate(vec![1, 2, 3], 1, 0);
        assert_eq!(page.pages(), 0);
        assert!(page.items.is_empty());
        assert!(!page.has_next());
    }

    #[test]
    fn window_collapses_gaps_into_single_markers() {
        let page = Page::<usize> {
            items: vec![],
            page: 10,
            per_page: 1,
            total: 20,
        };
        let window: Vec<Option<usize>> = page.iter_pages(2, 2, 5, 2).collect();
        assert_eq!(
            window,
            vec![
                Some(1),
                Some(2),
                None,
                Some(8),
                Some(9),
                Some(10),
                Some(11),
                Some(12),
                Some(13),
                Some(14),
                None,
                Some(19),
                Some(20),
            ]
        );
    }

    #[test]
    fn window_without_gaps_lists_every_page() {
        let page = Page::<usize> {
            items: vec![],
            page: 1,
            per_page: 1,
            total: 5,
        };
        let window: Vec<Option<usize>> = page.iter_pages(2, 2, 5, 2).collect();
        assert_eq!(
            window,
            vec![Some(1), Some(2), Some(3), Some(4), Some(5)]
        );
    }
}
