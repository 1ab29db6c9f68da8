//! User-curated movies, persisted under the `favorites` key.

use crate::model::Movie;
use crate::storage::{load_json, save_json, KeyValueStore, StorageError};

pub const FAVORITES_KEY: &str = "favorites";

pub struct FavoritesStore<S: KeyValueStore> {
    storage: S,
    movies: Vec<Movie>,
    recovered_from: Option<StorageError>,
}

impl<S: KeyValueStore> FavoritesStore<S> {
    /// Restore the persisted list in its original order
    pub fn open(storage: S) -> Self {
        let (movies, recovered_from) = match load_json::<Vec<Movie>>(&storage, FAVORITES_KEY) {
            Ok(movies) => (movies.unwrap_or_default(), None),
            Err(e) => (Vec::new(), Some(e)),
        };
        Self {
            storage,
            movies,
            recovered_from,
        }
    }

    pub fn list(&self) -> &[Movie] {
        &self.movies
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn recovered_from(&self) -> Option<&StorageError> {
        self.recovered_from.as_ref()
    }

    /// Append without a duplicate check
    pub fn add(&mut self, movie: Movie) -> Result<(), StorageError> {
        self.movies.push(movie);
        self.persist()
    }

    /// Remove every entry with this id
    pub fn remove(&mut self, id: u64) -> Result<(), StorageError> {
        self.movies.retain(|m| m.id != id);
        self.persist()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.movies.iter().any(|m| m.id == id)
    }

    /// Remove if present, otherwise add. Returns whether it is now a favorite.
    pub fn toggle(&mut self, movie: Movie) -> Result<bool, StorageError> {
        if self.contains(movie.id) {
            self.remove(movie.id)?;
            Ok(false)
        } else {
            self.add(movie)?;
            Ok(true)
        }
    }

    fn persist(&self) -> Result<(), StorageError> {
        save_json(&self.storage, FAVORITES_KEY, &self.movies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fake::movie;
    use crate::storage::{FileStore, MemoryStore};
    use tempfile::TempDir;

    #[test]
    fn test_contains_before_and_after_add() {
        let mut favorites = FavoritesStore::open(MemoryStore::new());
        assert!(!favorites.contains(42));
        favorites.add(movie(42, "Answer")).unwrap();
        assert!(favorites.contains(42));
    }

    #[test]
    fn test_add_allows_duplicates_and_remove_strips_all() {
        let storage = MemoryStore::new();
        let mut favorites = FavoritesStore::open(storage.clone());
        favorites.add(movie(42, "Answer")).unwrap();
        favorites.add(movie(42, "Answer")).unwrap();
        assert_eq!(favorites.list().len(), 2);

        favorites.remove(42).unwrap();
        assert!(favorites.is_empty());

        let persisted: Vec<Movie> = load_json(&storage, FAVORITES_KEY).unwrap().unwrap();
        assert!(persisted.is_empty());
    }

    #[test]
    fn test_remove_keeps_other_entries_in_order() {
        let mut favorites = FavoritesStore::open(MemoryStore::new());
        for id in [1, 2, 3, 2] {
            favorites.add(movie(id, "m")).unwrap();
        }
        favorites.remove(2).unwrap();
        let ids: Vec<u64> = favorites.list().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let storage = MemoryStore::new();
        let mut favorites = FavoritesStore::open(storage.clone());
        favorites.add(movie(1, "One")).unwrap();
        let persisted: Vec<Movie> = load_json(&storage, FAVORITES_KEY).unwrap().unwrap();
        assert_eq!(persisted.len(), 1);

        favorites.add(movie(2, "Two")).unwrap();
        let persisted: Vec<Movie> = load_json(&storage, FAVORITES_KEY).unwrap().unwrap();
        assert_eq!(persisted.len(), 2);
    }

    #[test]
    fn test_contains_does_not_write() {
        let storage = MemoryStore::new();
        let favorites = FavoritesStore::open(storage.clone());
        assert!(!favorites.contains(1));
        assert!(storage.get(FAVORITES_KEY).unwrap().is_none());
    }

    #[test]
    fn test_restore_preserves_order() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());
        {
            let mut favorites = FavoritesStore::open(store.clone());
            favorites.add(movie(30, "Third")).unwrap();
            favorites.add(movie(10, "First")).unwrap();
            favorites.add(movie(20, "Second")).unwrap();
        }

        let favorites = FavoritesStore::open(store);
        let ids: Vec<u64> = favorites.list().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![30, 10, 20]);
        assert_eq!(favorites.list()[1].title, "First");
        assert!(favorites.recovered_from().is_none());
    }

    #[test]
    fn test_restore_corrupt_list_falls_back_to_empty() {
        let storage = MemoryStore::new();
        storage.set(FAVORITES_KEY, "{\"id\": 1}").unwrap();
        let favorites = FavoritesStore::open(storage);
        assert!(favorites.is_empty());
        assert!(favorites.recovered_from().unwrap().is_corrupt());
    }

    #[test]
    fn test_toggle() {
        let mut favorites = FavoritesStore::open(MemoryStore::new());
        assert!(favorites.toggle(movie(5, "Five")).unwrap());
        assert!(favorites.contains(5));
        assert!(!favorites.toggle(movie(5, "Five")).unwrap());
        assert!(!favorites.contains(5));
    }
}
