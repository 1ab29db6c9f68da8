//! Plain-text rendering of pages, details, and the player.

use crate::browse::PageView;
use crate::catalog::ImageUrls;
use crate::model::{Genre, Movie, MovieDetails, User};
use crate::player::Playback;
use std::fmt::Write;

const OVERVIEW_WIDTH: usize = 160;

/// One grid cell: favorite marker, id, title, year, rating
pub fn movie_line(movie: &Movie, favorite: bool) -> String {
    let marker = if favorite { "♥" } else { " " };
    let year = movie
        .year()
        .map(|y| format!(" ({})", y))
        .unwrap_or_default();
    format!(
        "{} {:>8}  {}{}  ★ {:.1}",
        marker, movie.id, movie.title, year, movie.vote_average
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('…');
    out
}

pub fn page(view: &PageView, is_favorite: impl Fn(u64) -> bool) -> String {
    let mut out = String::new();

    if let Some(featured) = &view.featured {
        let _ = writeln!(out, "== Featured: {} ==", featured.title);
        if !featured.overview.is_empty() {
            let _ = writeln!(out, "{}", truncate(&featured.overview, OVERVIEW_WIDTH));
        }
        let _ = writeln!(out, "{}", movie_line(featured, is_favorite(featured.id)));
        let _ = writeln!(out);
    }

    for section in &view.sections {
        let _ = writeln!(out, "{} ({})", section.title, section.movies.len());
        if section.movies.is_empty() {
            let _ = writeln!(out, "  (nothing here)");
        }
        for movie in &section.movies {
            let _ = writeln!(out, "{}", movie_line(movie, is_favorite(movie.id)));
        }
        let _ = writeln!(out);
    }

    out.trim_end().to_string()
}

pub fn details(details: &MovieDetails, images: &ImageUrls) -> String {
    let movie = &details.movie;
    let mut out = String::new();

    let year = movie.year().map(|y| format!(" ({})", y)).unwrap_or_default();
    let _ = writeln!(out, "{}{}", movie.title, year);
    if !details.tagline.is_empty() {
        let _ = writeln!(out, "\"{}\"", details.tagline);
    }

    let mut facts = vec![format!("★ {:.1}", movie.vote_average)];
    if let Some(runtime) = details.runtime {
        facts.push(format!("{}h {}m", runtime / 60, runtime % 60));
    }
    if !details.genres.is_empty() {
        let names: Vec<&str> = details.genres.iter().map(|g| g.name.as_str()).collect();
        facts.push(names.join(", "));
    }
    if movie.adult {
        facts.push("18+".to_string());
    }
    let _ = writeln!(out, "{}", facts.join(" · "));

    if !movie.overview.is_empty() {
        let _ = writeln!(out, "\n{}", movie.overview);
    }

    if !details.production_companies.is_empty() {
        let names: Vec<&str> = details
            .production_companies
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        let _ = writeln!(out, "\nProduced by {}", names.join(", "));
    }

    if let Some(path) = &movie.poster_path {
        let _ = writeln!(out, "Poster:   {}", images.image_url(path));
    }
    if let Some(path) = &movie.backdrop_path {
        let _ = writeln!(out, "Backdrop: {}", images.backdrop_url(path));
    }

    out.trim_end().to_string()
}

pub fn playback(p: &Playback) -> String {
    format!(
        "▶ {} - {}\n  video:  {}\n  poster: {}",
        p.title, p.caption, p.video_url, p.poster
    )
}

pub fn user(user: &User) -> String {
    let mut out = format!("{} <{}>", user.username, user.email);
    if let Some(name) = &user.name {
        if name != &user.username {
            out = format!("{} ({})", out, name);
        }
    }
    if let Some(avatar) = &user.avatar {
        out.push_str(&format!("\n  avatar: {}", avatar));
    }
    out
}

pub fn genres(genres: &[Genre]) -> String {
    genres
        .iter()
        .map(|g| format!("{:>6}  {}", g.id, g.name))
        .collect::<Vec<_>>()
        .join("\n")
}
