//! # Playlist
//!
//! m3u8 text generation for a recording session. Two views over the
//! same ordered segment list:
//!
//! - the **live** view grows as segments land and carries no end
//!   marker, so it can be regenerated and overwritten on every append;
//! - the **sealed** view is written once at session end, declares
//!   `#EXT-X-PLAYLIST-TYPE:VOD` and terminates with `#EXT-X-ENDLIST`.
//!
//! Both are pure functions of their arguments. The sealed view is
//! byte-deterministic for a given input list, and the live view for the
//! first `k` segments is a textual prefix of the live view for the
//! first `k + 1`.

use segment_store::SegmentMeta;

fn header(rotation_interval_seconds: f64) -> String {
    let target_duration = rotation_interval_seconds.ceil() as u64;
    format!(
        "#EXTM3U\n\
         #EXT-X-VERSION:3\n\
         #EXT-X-TARGETDURATION:{target_duration}\n\
         #EXT-X-MEDIA-SEQUENCE:0\n"
    )
}

// Fixed 6-decimal durations; strict parsers reject sloppier formats.
fn push_entry(out: &mut String, meta: &SegmentMeta) {
    out.push_str(&format!("#EXTINF:{:.6},\n{}\n", meta.duration, meta.filename));
}

/// Growing playlist for an in-progress session.
pub fn live_playlist(segments: &[SegmentMeta], rotation_interval_seconds: f64) -> String {
    let mut out = header(rotation_interval_seconds);
    for meta in segments {
        push_entry(&mut out, meta);
    }
    out
}

/// Complete playlist written exactly once when a session ends.
pub fn sealed_playlist(segments: &[SegmentMeta], rotation_interval_seconds: f64) -> String {
    let mut out = header(rotation_interval_seconds);
    out.push_str("#EXT-X-PLAYLIST-TYPE:VOD\n");
    for meta in segments {
        push_entry(&mut out, meta);
    }
    out.push_str("#EXT-X-ENDLIST\n");
    out
}
