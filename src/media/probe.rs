//! Parsers for the human-readable listings printed by mkvinfo and mkvmerge.
//!
//! Field labels are looked up in a [`LabelTable`] so localized tool output
//! (English and Spanish by default) parses the same way.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::debug;

use crate::config::model::{LabelField, LabelTable};

/// What a descriptor's text is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    /// A track's name.
    Name,
    /// The segment title.
    Title,
}

/// A piece of editable text in a media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackDescriptor {
    /// Track number as used by mkvpropedit (`track:N`); 0 for the title.
    pub id: u64,
    /// Whether this is a track name or the title.
    pub kind: DescriptorKind,
    /// The current text.
    pub text: String,
}

impl TrackDescriptor {
    pub fn track(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            kind: DescriptorKind::Name,
            text: text.into(),
        }
    }

    pub fn title(text: impl Into<String>) -> Self {
        Self {
            id: 0,
            kind: DescriptorKind::Title,
            text: text.into(),
        }
    }
}

/// Named tracks and title of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackListing {
    /// Tracks that carry a name, in file order.
    pub tracks: Vec<TrackDescriptor>,
    /// Segment title, if the file has one.
    pub title: Option<String>,
}

/// An attachment reported by `mkvmerge --identify`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: u64,
    pub file_name: String,
}

/// Parses `mkvinfo` output into named tracks and the title.
///
/// mkvinfo prints a tree where `|` and spaces before the `+` give the depth.
/// Names are only taken inside a track element, so tag `Name:` entries
/// further down are ignored.
pub fn parse_mkvinfo(output: &str, labels: &LabelTable) -> TrackListing {
    let mut listing = TrackListing::default();
    let mut current_track: Option<u64> = None;

    for line in output.lines() {
        let Some(plus) = line.find('+') else {
            continue;
        };
        let depth = line[..plus].chars().count();
        let entry = line[plus + 1..].trim();

        let Some((label, value)) = entry.split_once(':') else {
            // Element header such as "Tracks", "Track" or "Tags"
            if depth <= 2 {
                current_track = None;
            }
            continue;
        };
        let value = value.trim();

        if labels.is(LabelField::TrackNumber, label) {
            current_track = first_number(value);
            if current_track.is_none() {
                debug!(line, "Track number line without a number");
            }
        } else if labels.is(LabelField::Name, label) {
            if let Some(id) = current_track {
                if !value.is_empty() {
                    listing.tracks.push(TrackDescriptor::track(id, value));
                }
            }
        } else if labels.is(LabelField::Title, label)
            && listing.title.is_none()
            && !value.is_empty()
        {
            listing.title = Some(value.to_string());
        }
    }

    listing
}

/// Parses the attachment lines of `mkvmerge --identify` output.
///
/// Lines look like
/// `Attachment ID 1: type 'font/ttf', size 1234 bytes, file name 'GDR.ttf'`.
pub fn parse_attachments(output: &str, labels: &LabelTable) -> Vec<Attachment> {
    let id_patterns = label_patterns(labels.labels(LabelField::AttachmentId), r"^\s*{}\s+(\d+)");
    let name_patterns = label_patterns(labels.labels(LabelField::FileName), r"{}\s+'(.*)'");

    let mut attachments = Vec::new();

    for line in output.lines() {
        let Some(id) = id_patterns
            .iter()
            .find_map(|re| re.captures(line))
            .and_then(|c| c[1].parse::<u64>().ok())
        else {
            continue;
        };

        match name_patterns.iter().find_map(|re| re.captures(line)) {
            Some(caps) => attachments.push(Attachment {
                id,
                file_name: caps[1].to_string(),
            }),
            None => debug!(line, "Attachment line without a file name"),
        }
    }

    attachments
}

/// Builds one case-insensitive regex per label from a `{}` template.
fn label_patterns(labels: &[String], template: &str) -> Vec<Regex> {
    labels
        .iter()
        .filter_map(|label| {
            let source = template.replace("{}", &regex::escape(label));
            RegexBuilder::new(&source).case_insensitive(true).build().ok()
        })
        .collect()
}

/// Returns the first run of ASCII digits in `text`.
fn first_number(text: &str) -> Option<u64> {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|part| !part.is_empty())
        .and_then(|part| part.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MKVINFO_EN: &str = "\
+ EBML head
|+ EBML version: 1
+ Segment: size 1048576
|+ Segment information
| + Timestamp scale: 1000000
| + Title: Summer Hit [GDR]
| + Muxing application: libebml v1.4.2 + libmatroska v1.6.4
|+ Tracks
| + Track
|  + Track number: 1 (track ID for mkvmerge & mkvextract: 0)
|  + Track type: video
|  + Name: Video
| + Track
|  + Track number: 2 (track ID for mkvmerge & mkvextract: 1)
|  + Track type: audio
|  + Name: Audio [GDR]
| + Track
|  + Track number: 3 (track ID for mkvmerge & mkvextract: 2)
|  + Track type: subtitles
|+ Tags
| + Tag
|  + Simple
|   + Name: ENCODER
|   + String: GDR encoder
";

    const MKVINFO_ES: &str = "\
+ Cabecera EBML
+ Segmento: tamaño 1048576
|+ Información del segmento
| + Título: Episodio 01 - GDR
|+ Pistas
| + Pista
|  + Número de pista: 1 (ID de pista para mkvmerge y mkvextract: 0)
|  + Nombre: Español [GDR]
";

    #[test]
    fn parses_english_listing() {
        let listing = parse_mkvinfo(MKVINFO_EN, &LabelTable::default());

        assert_eq!(listing.title.as_deref(), Some("Summer Hit [GDR]"));
        assert_eq!(
            listing.tracks,
            vec![
                TrackDescriptor::track(1, "Video"),
                TrackDescriptor::track(2, "Audio [GDR]"),
            ]
        );
    }

    #[test]
    fn tag_names_are_not_tracks() {
        let listing = parse_mkvinfo(MKVINFO_EN, &LabelTable::default());
        assert!(listing.tracks.iter().all(|t| t.text != "ENCODER"));
    }

    #[test]
    fn parses_spanish_listing() {
        let listing = parse_mkvinfo(MKVINFO_ES, &LabelTable::default());

        assert_eq!(listing.title.as_deref(), Some("Episodio 01 - GDR"));
        assert_eq!(listing.tracks, vec![TrackDescriptor::track(1, "Español [GDR]")]);
    }

    #[test]
    fn missing_title_is_absent_not_an_error() {
        let output = "|+ Tracks\n| + Track\n|  + Track number: 1\n";
        let listing = parse_mkvinfo(output, &LabelTable::default());
        assert_eq!(listing.title, None);
        assert!(listing.tracks.is_empty());
    }

    #[test]
    fn custom_labels_replace_defaults() {
        let mut labels = LabelTable::default();
        labels.set(LabelField::Title, vec!["Titre".to_string()]);

        let listing = parse_mkvinfo("| + Titre: Film [GDR]\n| + Title: ignored\n", &labels);
        assert_eq!(listing.title.as_deref(), Some("Film [GDR]"));
    }

    #[test]
    fn parses_attachments_in_both_languages() {
        let output = "\
File 'ep01.mkv': container: Matroska
Track ID 0: video (AVC/H.264/MPEG-4p10)
Attachment ID 1: type 'font/ttf', size 56084 bytes, file name 'GDR.ttf'
Attachment ID 2: type 'font/otf', size 1024 bytes, file name 'Arial's Bold.otf'
ID del archivo adjunto 3: tipo 'font/ttf', tamaño 10 bytes, nombre de archivo 'otro.ttf'
";
        let attachments = parse_attachments(output, &LabelTable::default());

        assert_eq!(
            attachments,
            vec![
                Attachment { id: 1, file_name: "GDR.ttf".to_string() },
                Attachment { id: 2, file_name: "Arial's Bold.otf".to_string() },
                Attachment { id: 3, file_name: "otro.ttf".to_string() },
            ]
        );
    }

    #[test]
    fn first_number_skips_leading_text() {
        assert_eq!(first_number("2 (track ID for mkvmerge & mkvextract: 1)"), Some(2));
        assert_eq!(first_number("none"), None);
    }
}
