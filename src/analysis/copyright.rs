use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::analysis::imageops::{connected_regions, edge_mask};
use crate::score::Score;
use crate::video::{AudioTrack, FrameSampler, SampledFrame};

/// Filename keyword families used to annotate potential copyright sources.
/// Annotation only: these never feed the score.
const MOVIE_KEYWORDS: [&str; 5] = ["movie", "film", "cinema", "trailer", "clip"];
const MUSIC_KEYWORDS: [&str; 5] = ["song", "music", "audio", "track", "album"];
const TV_KEYWORDS: [&str; 4] = ["episode", "series", "show", "tv"];

/// Audio-energy music proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSignal {
    pub score: Score,
    pub duration_seconds: f64,
    pub has_music: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Logo/watermark visual proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualSignal {
    pub score: Score,
    pub logo_frames: usize,
    pub frames_analyzed: usize,
}

/// Copyright signal: the worse of the audio and visual sub-scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyrightAnalysis {
    pub overall_score: Score,
    pub confidence: Score,
    pub audio: AudioSignal,
    pub visual: VisualSignal,
    pub potential_sources: Vec<String>,
}

/// Audio-energy plus logo-shape heuristic standing in for fingerprinting.
#[derive(Debug, Clone, Default)]
pub struct CopyrightDetector;

impl CopyrightDetector {
    pub const SAMPLE_TARGET: usize = 20;

    /// Logo-sized contour band in pixels².
    const LOGO_AREA_MIN: u32 = 100;
    const LOGO_AREA_MAX: u32 = 5000;
    const LOGO_ASPECT_MIN: f32 = 0.5;
    const LOGO_ASPECT_MAX: f32 = 3.0;

    /// More than this many logo-sized contours flags a frame.
    const LOGO_CANDIDATE_LIMIT: usize = 3;

    const EDGE_THRESHOLD: f32 = 100.0;

    pub fn new() -> Self {
        Self
    }

    pub async fn analyze(
        &self,
        sampler: &FrameSampler,
        audio: Option<&AudioTrack>,
    ) -> Result<CopyrightAnalysis> {
        let frames = sampler.sample_frames(Self::SAMPLE_TARGET).await?;
        Ok(Self::score_signals(
            &frames,
            audio,
            &sampler.info().filename,
        ))
    }

    /// Combine the two sub-scores; split out for synthetic-input tests.
    pub fn score_signals(
        frames: &[SampledFrame],
        audio: Option<&AudioTrack>,
        filename: &str,
    ) -> CopyrightAnalysis {
        let audio_signal = Self::audio_signal(audio);
        let visual_signal = Self::visual_signal(frames);

        let overall_score = audio_signal.score.max(visual_signal.score);

        CopyrightAnalysis {
            overall_score,
            confidence: Score::clamped(overall_score.value() * 1.2),
            audio: audio_signal,
            visual: visual_signal,
            potential_sources: Self::potential_sources(filename),
        }
    }

    /// Music-likeness from the mono track: high steady energy with a low
    /// zero-crossing density reads as music rather than speech or noise.
    pub fn audio_signal(audio: Option<&AudioTrack>) -> AudioSignal {
        let Some(track) = audio else {
            return AudioSignal {
                score: Score::ZERO,
                duration_seconds: 0.0,
                has_music: false,
                reason: Some("no audio track".to_string()),
            };
        };

        let score = Self::music_score(&track.samples);

        AudioSignal {
            score,
            duration_seconds: track.duration_seconds(),
            has_music: score.value() > 0.5,
            reason: None,
        }
    }

    fn music_score(samples: &[f32]) -> Score {
        if samples.is_empty() {
            return Score::ZERO;
        }

        let mean_square = samples
            .iter()
            .map(|&s| f64::from(s) * f64::from(s))
            .sum::<f64>()
            / samples.len() as f64;
        let rms = mean_square.sqrt();

        let sign = |s: f32| -> f64 {
            if s > 0.0 {
                1.0
            } else if s < 0.0 {
                -1.0
            } else {
                0.0
            }
        };
        let zero_crossing_rate = samples
            .windows(2)
            .map(|pair| (sign(pair[1]) - sign(pair[0])).abs())
            .sum::<f64>()
            / (samples.len() - 1).max(1) as f64;

        Score::clamped((rms * 10.0).min(1.0) * (1.0 - zero_crossing_rate.min(1.0)))
    }

    /// Count frames with enough logo-sized edge contours to look branded.
    pub fn visual_signal(frames: &[SampledFrame]) -> VisualSignal {
        let logo_frames = frames
            .iter()
            .filter(|frame| Self::has_logo_candidates(&frame.image))
            .count();

        let ratio = logo_frames as f64 / frames.len().max(1) as f64;

        VisualSignal {
            score: Score::clamped(ratio * 2.0),
            logo_frames,
            frames_analyzed: frames.len(),
        }
    }

    fn has_logo_candidates(image: &RgbImage) -> bool {
        let luma = image::imageops::grayscale(image);
        let edges = edge_mask(&luma, Self::EDGE_THRESHOLD);

        let candidates = connected_regions(&edges)
            .iter()
            .filter(|region| {
                region.area > Self::LOGO_AREA_MIN
                    && region.area < Self::LOGO_AREA_MAX
                    && region.aspect_ratio() > Self::LOGO_ASPECT_MIN
                    && region.aspect_ratio() < Self::LOGO_ASPECT_MAX
            })
            .count();

        candidates > Self::LOGO_CANDIDATE_LIMIT
    }

    /// Annotate likely source families from the filename.
    pub fn potential_sources(filename: &str) -> Vec<String> {
        let name = filename.to_lowercase();
        let mut sources = Vec::new();

        for keyword in MOVIE_KEYWORDS {
            if name.contains(keyword) {
                sources.push(format!("Movie content (keyword: {})", keyword));
            }
        }
        for keyword in MUSIC_KEYWORDS {
            if name.contains(keyword) {
                sources.push(format!("Music content (keyword: {})", keyword));
            }
        }
        for keyword in TV_KEYWORDS {
            if name.contains(keyword) {
                sources.push(format!("TV content (keyword: {})", keyword));
            }
        }

        sources
    }
}
