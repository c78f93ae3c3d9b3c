use std::collections::HashMap;

use crate::model::{SegmentHashList, VideoId};

/// Early-exit threshold: a Hamming distance strictly below this is accepted
/// as "near enough" and stops the inner search for a candidate.
pub const EARLY_EXIT_DISTANCE: u32 = 5;

/// A candidate source video and its minimum Hamming distance to any query hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedCandidate {
    pub video_id: VideoId,
    pub min_distance: u32,
}

/// Ranks every source video in `corpus_hashes` by the minimum Hamming distance
/// between any query hash in `clip_hashes` and any of that source's hashes.
/// Returns candidates sorted by `min_distance` ascending, ties broken by
/// `VideoId` lexicographic order.
#[must_use]
pub fn rank(
    clip_hashes: &SegmentHashList,
    corpus_hashes: &HashMap<VideoId, SegmentHashList>,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = corpus_hashes
        .iter()
        .filter_map(|(video_id, source_hashes)| {
            min_distance(clip_hashes, source_hashes).map(|min_distance| RankedCandidate {
                video_id: video_id.clone(),
                min_distance,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.min_distance
            .cmp(&b.min_distance)
            .then_with(|| a.video_id.cmp(&b.video_id))
    });

    ranked
}

fn min_distance(clip_hashes: &SegmentHashList, source_hashes: &SegmentHashList) -> Option<u32> {
    let mut best: Option<u32> = None;

    'outer: for c in clip_hashes.as_slice() {
        for s in source_hashes.as_slice() {
            let d = c.hamming_distance(s);
            best = Some(best.map_or(d, |b| b.min(d)));
            if d < EARLY_EXIT_DISTANCE {
                break 'outer;
            }
        }
    }

    best
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::SegmentHash;

    fn hashes(bits: &[u64]) -> SegmentHashList {
        SegmentHashList::new(bits.iter().copied().map(SegmentHash::from_bits).collect())
    }

    #[test]
    fn ranker_orders_by_min_distance_then_video_id() {
        let clip = hashes(&[0b1]);
        let mut corpus = HashMap::new();
        corpus.insert(VideoId::new("A"), hashes(&[0b1]));
        corpus.insert(VideoId::new("B"), hashes(&[0b11])); // xor distance 1 from clip
        let ranked = rank(&clip, &corpus);

        assert_eq!(ranked[0], RankedCandidate { video_id: VideoId::new("A"), min_distance: 0 });
        assert_eq!(ranked[1], RankedCandidate { video_id: VideoId::new("B"), min_distance: 1 });
    }

    #[test]
    fn ties_broken_by_video_id_lexicographic_order() {
        let clip = hashes(&[0b0]);
        let mut corpus = HashMap::new();
        corpus.insert(VideoId::new("z"), hashes(&[0b1]));
        corpus.insert(VideoId::new("a"), hashes(&[0b1]));
        let ranked = rank(&clip, &corpus);
        assert_eq!(ranked[0].video_id, VideoId::new("a"));
        assert_eq!(ranked[1].video_id, VideoId::new("z"));
    }

    #[test]
    fn scenario_s6_matches_spec_example() {
        let clip = hashes(&[0b1010]);
        let mut corpus = HashMap::new();
        corpus.insert(VideoId::new("A"), hashes(&[0b1010]));
        corpus.insert(VideoId::new("B"), hashes(&[0b1010 ^ 0b1]));
        let ranked = rank(&clip, &corpus);
        assert_eq!(
            ranked,
            vec![
                RankedCandidate { video_id: VideoId::new("A"), min_distance: 0 },
                RankedCandidate { video_id: VideoId::new("B"), min_distance: 1 },
            ]
        );
    }
}
