use crate::config::PlayerConfig;
use crate::model::Movie;
use anyhow::{anyhow, Result};
use rand::seq::SliceRandom;

/// What the player shows for one movie
#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    pub title: String,
    pub caption: &'static str,
    pub video_url: String,
    pub poster: String,
}

pub struct Player {
    config: PlayerConfig,
}

impl Player {
    pub fn new(config: PlayerConfig) -> Self {
        Self { config }
    }

    /// Pick a sample video for the movie; every title plays a preview clip
    pub fn play(&self, movie: &Movie) -> Result<Playback> {
        let video_url = self
            .config
            .sample_videos
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| anyhow!("No sample videos configured"))?;

        Ok(Playback {
            title: movie.title.clone(),
            caption: "Sample Preview",
            video_url: video_url.clone(),
            poster: self.config.poster.clone(),
        })
    }
}
