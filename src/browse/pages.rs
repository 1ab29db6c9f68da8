//! What each browse page shows and how it is assembled from catalog lists.
//!
//! A failed list fetch never fails the page: the list is replaced by an empty
//! one and the error is recorded on the view for the caller to report.

use super::cancel::CancelToken;
use crate::catalog::Catalog;
use crate::model::Movie;
use anyhow::Result;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Movies,
    Series,
    Documentaries,
    ComingSoon,
    Favorites,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::Home,
        Page::Movies,
        Page::Series,
        Page::Documentaries,
        Page::ComingSoon,
        Page::Favorites,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Movies => "movies",
            Self::Series => "series",
            Self::Documentaries => "documentaries",
            Self::ComingSoon => "coming-soon",
            Self::Favorites => "favorites",
        }
    }
}

impl std::str::FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "home" => Ok(Self::Home),
            "movies" => Ok(Self::Movies),
            "series" | "tv" => Ok(Self::Series),
            "documentaries" | "docs" => Ok(Self::Documentaries),
            "coming-soon" | "comingsoon" | "coming_soon" | "soon" => Ok(Self::ComingSoon),
            "favorites" | "favourites" | "favs" => Ok(Self::Favorites),
            _ => Err(format!("Unknown page: '{}'", s)),
        }
    }
}

/// Where a navigation goes: a sidebar page or a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Page(Page),
    Search(String),
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Page(page) => write!(f, "{}", page.as_str()),
            Destination::Search(query) => write!(f, "search \"{}\"", query),
        }
    }
}

/// A titled row of movies
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub movies: Vec<Movie>,
}

impl Section {
    fn new(title: &str, movies: Vec<Movie>) -> Self {
        Self {
            title: title.to_string(),
            movies,
        }
    }
}

/// A fully loaded page, ready to render
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub destination: Destination,
    pub featured: Option<Movie>,
    pub sections: Vec<Section>,
    /// Fetch failures that were replaced by empty lists
    pub errors: Vec<String>,
}

impl PageView {
    fn new(destination: Destination) -> Self {
        Self {
            destination,
            featured: None,
            sections: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// The favorites page is built from local state, not the catalog
    pub fn favorites(movies: &[Movie]) -> Self {
        let mut view = Self::new(Destination::Page(Page::Favorites));
        view.sections.push(Section::new("Favourites", movies.to_vec()));
        view
    }

    /// Every movie on the page, featured first
    pub fn movies(&self) -> impl Iterator<Item = &Movie> {
        self.featured
            .iter()
            .chain(self.sections.iter().flat_map(|s| s.movies.iter()))
    }

    pub fn is_empty(&self) -> bool {
        self.movies().next().is_none()
    }

    fn take(&mut self, fetched: Result<Vec<Movie>>) -> Vec<Movie> {
        match fetched {
            Ok(movies) => movies,
            Err(e) => {
                self.errors.push(e.to_string());
                Vec::new()
            }
        }
    }
}

/// `movies[start..end]`, clamped to what is available
fn window(movies: &[Movie], start: usize, end: usize) -> Vec<Movie> {
    let end = end.min(movies.len());
    let start = start.min(end);
    movies[start..end].to_vec()
}

/// Keep the first occurrence of each id
fn dedup_by_id(movies: Vec<Movie>) -> Vec<Movie> {
    let mut seen = HashSet::new();
    movies.into_iter().filter(|m| seen.insert(m.id)).collect()
}

/// Run a fetch unless the token is already cancelled
fn guarded<F>(token: &CancelToken, fetch: F) -> Result<Vec<Movie>>
where
    F: FnOnce() -> Result<Vec<Movie>>,
{
    if token.is_cancelled() {
        return Err(anyhow::anyhow!("load cancelled"));
    }
    fetch()
}

/// Run two fetches side by side, each skipped once the token is cancelled
fn both<A, B>(token: &CancelToken, a: A, b: B) -> (Result<Vec<Movie>>, Result<Vec<Movie>>)
where
    A: FnOnce() -> Result<Vec<Movie>> + Send,
    B: FnOnce() -> Result<Vec<Movie>> + Send,
{
    std::thread::scope(|s| {
        let second = s.spawn(|| guarded(token, b));
        let first = guarded(token, a);
        let second = second
            .join()
            .unwrap_or_else(|_| Err(anyhow::anyhow!("fetch thread panicked")));
        (first, second)
    })
}

/// Load a destination. Returns `None` if the token was cancelled along the way.
pub fn load(catalog: &dyn Catalog, destination: &Destination, token: &CancelToken) -> Option<PageView> {
    if token.is_cancelled() {
        return None;
    }

    let mut view = PageView::new(destination.clone());

    match destination {
        Destination::Page(Page::Home) => {
            let (popular, trending) = both(token, || catalog.popular(), || catalog.trending());
            let popular = view.take(popular);
            let trending = view.take(trending);
            view.featured = trending.first().cloned();
            view.sections.push(Section::new("Movies", window(&popular, 0, 10)));
            view.sections
                .push(Section::new("Continue watching", window(&trending, 1, 6)));
        }
        Destination::Page(Page::Movies) => {
            let (popular, top_rated) = both(token, || catalog.popular(), || catalog.top_rated());
            let mut all = view.take(popular);
            all.extend(view.take(top_rated));
            view.sections.push(Section::new("All Movies", dedup_by_id(all)));
        }
        Destination::Page(Page::Series) => {
            let trending = view.take(guarded(token, || catalog.trending()));
            view.sections
                .push(Section::new("TV Series", window(&trending, 0, 15)));
        }
        Destination::Page(Page::Documentaries) => {
            let top_rated = view.take(guarded(token, || catalog.top_rated()));
            view.sections
                .push(Section::new("Documentaries", window(&top_rated, 5, 20)));
        }
        Destination::Page(Page::ComingSoon) => {
            let trending = view.take(guarded(token, || catalog.trending()));
            view.sections
                .push(Section::new("Coming Soon", window(&trending, 10, 20)));
        }
        Destination::Page(Page::Favorites) => {
            // Local state; callers use PageView::favorites
        }
        Destination::Search(query) => {
            if !query.trim().is_empty() {
                let results = view.take(guarded(token, || catalog.search(query)));
                view.sections.push(Section::new("Search Results", results));
            }
        }
    }

    if token.is_cancelled() {
        return None;
    }
    Some(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fake::{movies, FakeCatalog};
    use std::sync::atomic::Ordering;

    fn ids(movies: &[Movie]) -> Vec<u64> {
        movies.iter().map(|m| m.id).collect()
    }

    fn load_page(catalog: &FakeCatalog, page: Page) -> PageView {
        load(catalog, &Destination::Page(page), &CancelToken::new()).unwrap()
    }

    #[test]
    fn test_home_layout() {
        let catalog = FakeCatalog {
            popular: Some(movies(100..120)),
            trending: Some(movies(1..20)),
            ..FakeCatalog::default()
        };
        let view = load_page(&catalog, Page::Home);

        assert_eq!(view.featured.as_ref().unwrap().id, 1);
        assert_eq!(view.sections[0].title, "Movies");
        assert_eq!(ids(&view.sections[0].movies), (100..110).collect::<Vec<_>>());
        assert_eq!(view.sections[1].title, "Continue watching");
        assert_eq!(ids(&view.sections[1].movies), vec![2, 3, 4, 5, 6]);
        assert!(view.errors.is_empty());
    }

    #[test]
    fn test_home_with_short_lists() {
        let catalog = FakeCatalog {
            popular: Some(movies(1..3)),
            trending: Some(vec![]),
            ..FakeCatalog::default()
        };
        let view = load_page(&catalog, Page::Home);
        assert!(view.featured.is_none());
        assert_eq!(view.sections[0].movies.len(), 2);
        assert!(view.sections[1].movies.is_empty());
    }

    #[test]
    fn test_movies_page_dedups_keeping_first() {
        let catalog = FakeCatalog {
            popular: Some(movies(1..5)),
            top_rated: Some(movies(3..8)),
            ..FakeCatalog::default()
        };
        let view = load_page(&catalog, Page::Movies);
        assert_eq!(view.sections[0].title, "All Movies");
        assert_eq!(ids(&view.sections[0].movies), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_slice_pages() {
        let catalog = FakeCatalog {
            trending: Some(movies(0..20)),
            top_rated: Some(movies(0..12)),
            ..FakeCatalog::default()
        };

        let series = load_page(&catalog, Page::Series);
        assert_eq!(series.sections[0].movies.len(), 15);

        let docs = load_page(&catalog, Page::Documentaries);
        assert_eq!(ids(&docs.sections[0].movies), vec![5, 6, 7, 8, 9, 10, 11]);

        let soon = load_page(&catalog, Page::ComingSoon);
        assert_eq!(ids(&soon.sections[0].movies), (10..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_failed_fetch_becomes_empty_with_error() {
        let catalog = FakeCatalog {
            popular: None,
            trending: Some(movies(1..4)),
            ..FakeCatalog::default()
        };
        let view = load_page(&catalog, Page::Home);
        assert!(view.sections[0].movies.is_empty());
        assert_eq!(view.featured.as_ref().unwrap().id, 1);
        assert_eq!(view.errors.len(), 1);
        assert!(view.errors[0].contains("/movie/popular"));
    }

    #[test]
    fn test_cancelled_before_start_fetches_nothing() {
        let catalog = FakeCatalog::default();
        let token = CancelToken::new();
        token.cancel();
        assert!(load(&catalog, &Destination::Page(Page::Series), &token).is_none());
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_blank_search_is_empty_view() {
        let catalog = FakeCatalog::default();
        let view = load(
            &catalog,
            &Destination::Search("  ".to_string()),
            &CancelToken::new(),
        )
        .unwrap();
        assert!(view.is_empty());
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_search_passes_query() {
        let catalog = FakeCatalog::default();
        let view = load(
            &catalog,
            &Destination::Search("blade runner".to_string()),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(view.sections[0].movies[0].title, "blade runner");
        assert_eq!(
            catalog.queries.lock().unwrap().as_slice(),
            &["blade runner".to_string()]
        );
    }

    #[test]
    fn test_page_names() {
        for page in Page::ALL {
            assert_eq!(page.as_str().parse::<Page>(), Ok(page));
        }
        assert_eq!("Docs".parse::<Page>(), Ok(Page::Documentaries));
        assert!("nope".parse::<Page>().unwrap_err().contains("nope"));
    }

    #[test]
    fn test_cancelled_token_skips_parallel_fetches() {
        let catalog = FakeCatalog {
            popular: Some(movies(1..3)),
            trending: Some(movies(3..6)),
            ..FakeCatalog::default()
        };
        let token = CancelToken::new();
        token.cancel();

        let (popular, trending) = both(&token, || catalog.popular(), || catalog.trending());
        assert!(popular.is_err());
        assert!(trending.is_err());
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_token_cancelled_by_first_fetch_skips_the_next() {
        let catalog = FakeCatalog {
            trending: Some(movies(1..3)),
            ..FakeCatalog::default()
        };
        let token = CancelToken::new();

        let first = guarded(&token, || {
            let fetched = catalog.trending();
            token.cancel();
            fetched
        });
        let second = guarded(&token, || catalog.trending());
        assert_eq!(first.unwrap().len(), 2);
        assert!(second.is_err());
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_favorites_view_and_movies_iterator() {
        let view = PageView::favorites(&movies(1..4));
        assert_eq!(view.sections[0].title, "Favourites");
        assert_eq!(view.movies().count(), 3);
        assert!(!view.is_empty());
    }
}
