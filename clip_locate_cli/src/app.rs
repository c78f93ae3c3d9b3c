use std::path::{Path, PathBuf};

use clap::Parser;
use log::{error, info, warn};

use clip_index_store::{ClipIndexStore, VideoId};
use clip_locator_core::{OrchestratorConfig, SegmentHasherConfig};

use crate::cli::{Cli, Command};
use crate::logging::configure_logs;
use crate::timestamp::format_timestamp;

pub const EXIT_OK: i32 = 0;
pub const EXIT_MATCH: i32 = 0;
pub const EXIT_NO_MATCH: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

pub fn run_app() -> i32 {
    let cli = Cli::parse();
    configure_logs(cli.verbosity());

    match cli.command {
        Command::Index {
            cache_file,
            video_paths,
        } => run_index(&cache_file, &video_paths),
        Command::Locate {
            cache_file,
            clip_path,
            clip_rgb_path,
        } => run_locate(&cache_file, &clip_path, &clip_rgb_path),
    }
}

fn run_index(cache_file: &Path, video_paths: &[PathBuf]) -> i32 {
    let store = match ClipIndexStore::open(cache_file.to_path_buf()) {
        Ok(store) => store,
        Err(e) => {
            error!("could not open index store {}: {e}", cache_file.display());
            return EXIT_ERROR;
        }
    };

    let hasher_config = SegmentHasherConfig::default();
    let mut failures = 0usize;

    for video_path in video_paths {
        let video_id = video_id_for(video_path);
        match store.fetch_update(&video_id, video_path, hasher_config) {
            Ok(Some(_)) => info!("indexed {video_id}"),
            Ok(None) => warn!("{video_id} not found on disk; removed from the index"),
            Err(e) => {
                error!("failed to index {}: {e}", video_path.display());
                failures += 1;
            }
        }
    }

    if let Err(e) = store.save() {
        error!("failed to save index store {}: {e}", cache_file.display());
        return EXIT_ERROR;
    }

    if failures > 0 {
        EXIT_ERROR
    } else {
        EXIT_OK
    }
}

fn run_locate(cache_file: &Path, clip_path: &Path, clip_rgb_path: &Path) -> i32 {
    let store = match ClipIndexStore::open(cache_file.to_path_buf()) {
        Ok(store) => store,
        Err(e) => {
            error!("could not open index store {}: {e}", cache_file.display());
            return EXIT_ERROR;
        }
    };

    let index = store.get_all();
    if index.is_empty() {
        warn!("index store {} is empty", cache_file.display());
    }

    let config = OrchestratorConfig::default();
    match clip_locator_core::locate(clip_path, clip_rgb_path, &index, &config) {
        Ok(Some(result)) => {
            print_match(&result.video_id, result.start_frame);
            EXIT_MATCH
        }
        Ok(None) => {
            #[allow(clippy::print_stdout)]
            let () = println!("no match found for {}", clip_path.display());
            EXIT_NO_MATCH
        }
        Err(e) => {
            error!("locate failed: {e}");
            if e.is_fatal() {
                EXIT_ERROR
            } else {
                EXIT_NO_MATCH
            }
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_match(video_id: &VideoId, start_frame: u64) {
    let source_path = source_video_path(video_id);
    match frame_io::VideoInfo::probe(&source_path) {
        Ok(info) => {
            let seconds = start_frame as f64 / f64::from(info.fps());
            println!(
                "match: {video_id} at frame {start_frame} ({})",
                format_timestamp(seconds)
            );
        }
        Err(_) => {
            println!("match: {video_id} at frame {start_frame}");
        }
    }
}

/// Derives a `VideoId` from a source video's path with only the extension
/// stripped, preserving the directory so that videos with the same basename
/// in different directories don't collide.
fn video_id_for(video_path: &Path) -> VideoId {
    let without_ext = video_path.with_extension("");
    VideoId::new(without_ext.to_string_lossy().into_owned())
}

fn source_video_path(video_id: &VideoId) -> PathBuf {
    PathBuf::from(video_id.as_str()).with_extension("mp4")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn video_id_preserves_the_parent_directory() {
        let id = video_id_for(Path::new("/videos/holiday_2019.mp4"));
        assert_eq!(id.as_str(), "/videos/holiday_2019");
    }

    #[test]
    fn video_id_distinguishes_same_basename_in_different_directories() {
        let a = video_id_for(Path::new("/a/clip.mp4"));
        let b = video_id_for(Path::new("/b/clip.mp4"));
        assert_ne!(a, b);
    }

    #[test]
    fn source_video_path_round_trips_through_the_mp4_convention() {
        let id = VideoId::new("/videos/holiday_2019");
        assert_eq!(
            source_video_path(&id),
            PathBuf::from("/videos/holiday_2019.mp4")
        );
    }
}
