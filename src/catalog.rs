use crate::config::CatalogConfig;
use crate::model::{Genre, Movie, MovieDetails};
use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ResultsPage {
    #[serde(default)]
    results: Vec<Movie>,
}

#[derive(Debug, Deserialize)]
struct GenreList {
    #[serde(default)]
    genres: Vec<Genre>,
}

/// Trait for catalog clients to allow mocking and abstraction
pub trait Catalog: Send + Sync {
    fn popular(&self) -> Result<Vec<Movie>>;
    fn trending(&self) -> Result<Vec<Movie>>;
    fn top_rated(&self) -> Result<Vec<Movie>>;
    fn details(&self, id: u64) -> Result<MovieDetails>;
    fn search(&self, query: &str) -> Result<Vec<Movie>>;
    fn genres(&self) -> Result<Vec<Genre>>;
}

pub struct Client {
    base_url: String,
    api_key: String,
    agent: ureq::Agent,
}

impl Client {
    pub fn new(config: &CatalogConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build();
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.resolve_api_key(),
            agent,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        let mut req = self
            .agent
            .get(&self.endpoint(path))
            .query("api_key", &self.api_key);
        for (k, v) in params {
            req = req.query(k, v);
        }

        match req.call() {
            Ok(r) => {
                let body: T = r.into_json()?;
                Ok(body)
            }
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(anyhow!("Catalog error {} on {}: {}", code, path, body))
            }
            Err(e) => Err(anyhow!("Request to {} failed: {}", path, e)),
        }
    }
}

impl Catalog for Client {
    fn popular(&self) -> Result<Vec<Movie>> {
        Ok(self.get::<ResultsPage>("/movie/popular", &[])?.results)
    }

    fn trending(&self) -> Result<Vec<Movie>> {
        Ok(self.get::<ResultsPage>("/trending/movie/week", &[])?.results)
    }

    fn top_rated(&self) -> Result<Vec<Movie>> {
        Ok(self.get::<ResultsPage>("/movie/top_rated", &[])?.results)
    }

    fn details(&self, id: u64) -> Result<MovieDetails> {
        self.get(&format!("/movie/{}", id), &[])
    }

    fn search(&self, query: &str) -> Result<Vec<Movie>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .get::<ResultsPage>("/search/movie", &[("query", query)])?
            .results)
    }

    fn genres(&self) -> Result<Vec<Genre>> {
        Ok(self.get::<GenreList>("/genre/movie/list", &[])?.genres)
    }
}

/// Builds artwork URLs from the catalog-relative paths on a movie
#[derive(Debug, Clone)]
pub struct ImageUrls {
    image_base_url: String,
    backdrop_base_url: String,
}

impl ImageUrls {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            image_base_url: config.image_base_url.clone(),
            backdrop_base_url: config.backdrop_base_url.clone(),
        }
    }

    pub fn image_url(&self, path: &str) -> String {
        format!("{}{}", self.image_base_url, path)
    }

    pub fn backdrop_url(&self, path: &str) -> String {
        format!("{}{}", self.backdrop_base_url, path)
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Canned catalog; lists set to `None` fail when requested
    #[derive(Default)]
    pub struct FakeCatalog {
        pub popular: Option<Vec<Movie>>,
        pub trending: Option<Vec<Movie>>,
        pub top_rated: Option<Vec<Movie>>,
        pub genres: Vec<Genre>,
        pub calls: AtomicUsize,
        pub queries: Mutex<Vec<String>>,
    }

    pub fn movie(id: u64, title: &str) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            overview: String::new(),
            poster_path: Some(format!("/{}.jpg", id)),
            backdrop_path: None,
            release_date: "2020-01-01".to_string(),
            vote_average: 7.5,
            genre_ids: vec![],
            adult: false,
        }
    }

    pub fn movies(ids: std::ops::Range<u64>) -> Vec<Movie> {
        ids.map(|id| movie(id, &format!("Movie {}", id))).collect()
    }

    impl FakeCatalog {
        fn list(&self, list: &Option<Vec<Movie>>, name: &str) -> Result<Vec<Movie>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            list.clone()
                .ok_or_else(|| anyhow!("Catalog error 500 on {}: unavailable", name))
        }
    }

    impl Catalog for FakeCatalog {
        fn popular(&self) -> Result<Vec<Movie>> {
            self.list(&self.popular, "/movie/popular")
        }

        fn trending(&self) -> Result<Vec<Movie>> {
            self.list(&self.trending, "/trending/movie/week")
        }

        fn top_rated(&self) -> Result<Vec<Movie>> {
            self.list(&self.top_rated, "/movie/top_rated")
        }

        fn details(&self, id: u64) -> Result<MovieDetails> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(MovieDetails {
                movie: movie(id, &format!("Movie {}", id)),
                genres: vec![],
                runtime: Some(100),
                tagline: String::new(),
                production_companies: vec![],
            })
        }

        fn search(&self, query: &str) -> Result<Vec<Movie>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.to_string());
            Ok(vec![movie(99, query)])
        }

        fn genres(&self) -> Result<Vec<Genre>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.genres.clone())
        }
    }
}
