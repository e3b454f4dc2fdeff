//! Evidence data model with structurally enforced image-source exclusivity.
//!
//! A report carries at most one image: either a camera capture or an uploaded
//! photo. Encoding that as a tagged union makes the "capturing clears the
//! upload and vice versa" rule impossible to violate. Video is additive.

use crate::audio::AudioClip;

/// File name used for camera captures in the multipart payload.
pub const CAPTURED_IMAGE_NAME: &str = "captured_image.jpg";

/// A still frame snapshotted from a live camera stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub bytes: Vec<u8>,
}

/// A user-supplied media file, keeping its original name for the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

/// The single image slot of a report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VisualEvidence {
    #[default]
    None,
    Captured(ImageBlob),
    Uploaded(MediaFile),
}

impl VisualEvidence {
    /// Installs a camera capture, discarding any uploaded photo.
    pub fn set_captured(&mut self, image: ImageBlob) {
        *self = VisualEvidence::Captured(image);
    }

    /// Installs an uploaded photo, discarding any camera capture.
    pub fn set_uploaded(&mut self, file: MediaFile) {
        *self = VisualEvidence::Uploaded(file);
    }

    pub fn clear(&mut self) {
        *self = VisualEvidence::None;
    }

    pub fn is_none(&self) -> bool {
        matches!(self, VisualEvidence::None)
    }

    /// Raw image bytes for severity analysis, whichever source is active.
    pub fn image_bytes(&self) -> Option<&[u8]> {
        match self {
            VisualEvidence::None => None,
            VisualEvidence::Captured(image) => Some(&image.bytes),
            VisualEvidence::Uploaded(file) => Some(&file.bytes),
        }
    }

    /// Bytes plus upload file name for the multipart image part.
    pub fn as_image_part(&self) -> Option<(&[u8], &str)> {
        match self {
            VisualEvidence::None => None,
            VisualEvidence::Captured(image) => Some((&image.bytes, CAPTURED_IMAGE_NAME)),
            VisualEvidence::Uploaded(file) => Some((&file.bytes, &file.file_name)),
        }
    }
}

/// Everything collected for one report: image slot, optional video, audio clip.
#[derive(Debug, Clone, Default)]
pub struct EvidenceBundle {
    pub visual: VisualEvidence,
    pub video: Option<MediaFile>,
    pub audio: Option<AudioClip>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture() -> ImageBlob {
        ImageBlob {
            bytes: b"jpeg-frame".to_vec(),
        }
    }

    fn upload() -> MediaFile {
        MediaFile {
            bytes: b"photo-file".to_vec(),
            file_name: "crash.jpg".to_string(),
        }
    }

    #[test]
    fn upload_after_capture_leaves_one_image_source() {
        let mut visual = VisualEvidence::None;
        visual.set_captured(capture());
        visual.set_uploaded(upload());

        let (bytes, name) = visual.as_image_part().expect("image part");
        assert_eq!(bytes, b"photo-file");
        assert_eq!(name, "crash.jpg");
    }

    #[test]
    fn capture_after_upload_leaves_one_image_source() {
        let mut visual = VisualEvidence::None;
        visual.set_uploaded(upload());
        visual.set_captured(capture());

        let (bytes, name) = visual.as_image_part().expect("image part");
        assert_eq!(bytes, b"jpeg-frame");
        assert_eq!(name, CAPTURED_IMAGE_NAME);
    }

    #[test]
    fn clear_discards_the_active_source() {
        let mut visual = VisualEvidence::None;
        visual.set_captured(capture());
        visual.clear();
        assert!(visual.is_none());
        assert!(visual.image_bytes().is_none());
        assert!(visual.as_image_part().is_none());
    }

    #[test]
    fn video_is_independent_of_the_image_slot() {
        let mut bundle = EvidenceBundle::default();
        bundle.video = Some(MediaFile {
            bytes: b"mp4".to_vec(),
            file_name: "scene.mp4".to_string(),
        });
        bundle.visual.set_captured(capture());
        bundle.visual.clear();
        assert!(bundle.video.is_some());
    }
}
