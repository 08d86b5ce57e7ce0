use tracing::debug;

use super::domain::PhotoArtifact;

const DEFAULT_MAX_PHOTOS: usize = 3;
const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Limits applied to uploaded photos before they are shown to the scoring model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaPolicy {
    pub max_photos: usize,
    pub max_bytes: usize,
}

impl Default for MediaPolicy {
    fn default() -> Self {
        Self {
            max_photos: DEFAULT_MAX_PHOTOS,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl MediaPolicy {
    /// Keep the first `max_photos` usable artifacts in upload order.
    ///
    /// Unusable artifacts (no mime type, not an image, empty or oversized payload) are
    /// skipped individually; a bad photo never fails the batch.
    pub fn normalize<'a>(&self, photos: &'a [PhotoArtifact]) -> Vec<&'a PhotoArtifact> {
        photos
            .iter()
            .filter(|photo| self.accepts(photo))
            .take(self.max_photos)
            .collect()
    }

    fn accepts(&self, photo: &PhotoArtifact) -> bool {
        let mime_type = photo.mime_type.trim();
        if mime_type.is_empty() || photo.data.is_empty() {
            debug!(filename = %photo.filename, "dropping photo without mime type or payload");
            return false;
        }

        match mime_type.parse::<mime::Mime>() {
            Ok(parsed) if parsed.type_() == mime::IMAGE => {}
            _ => {
                debug!(filename = %photo.filename, mime_type, "dropping non-image upload");
                return false;
            }
        }

        if photo.data.len() > self.max_bytes {
            debug!(
                filename = %photo.filename,
                size = photo.data.len(),
                max_bytes = self.max_bytes,
                "dropping oversized photo"
            );
            return false;
        }

        true
    }
}

/// Normalize with the default policy.
pub fn normalize(photos: &[PhotoArtifact]) -> Vec<&PhotoArtifact> {
    MediaPolicy::default().normalize(photos)
}
