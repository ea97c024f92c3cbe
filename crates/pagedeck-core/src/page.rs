//! Page records: the entries of the working collection

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::render::RasterSurface;

/// Rotation in degrees, normalized to [0, 360).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rotation(u16);

impl Rotation {
    pub const NONE: Rotation = Rotation(0);

    pub fn from_degrees(degrees: i32) -> Self {
        Rotation(degrees.rem_euclid(360) as u16)
    }

    /// Additive rotation: deltas sum mod 360.
    pub fn rotated_by(self, delta: i32) -> Self {
        Self::from_degrees(self.0 as i32 + delta)
    }

    pub fn degrees(self) -> u16 {
        self.0
    }
}

/// Handle to a rendered preview surface.
///
/// `Clone` shares the pixels: snapshots and cache hits never copy rasters.
/// [`Thumbnail::detach`] makes a pixel-identical independent copy so a
/// duplicated page can diverge from the page it was copied from.
#[derive(Debug, Clone)]
pub struct Thumbnail(Arc<RasterSurface>);

impl Thumbnail {
    pub fn new(surface: RasterSurface) -> Self {
        Thumbnail(Arc::new(surface))
    }

    pub fn from_shared(surface: Arc<RasterSurface>) -> Self {
        Thumbnail(surface)
    }

    pub fn surface(&self) -> &RasterSurface {
        &self.0
    }

    pub fn shared(&self) -> Arc<RasterSurface> {
        Arc::clone(&self.0)
    }

    /// Pixel-identical copy with its own allocation.
    pub fn detach(&self) -> Thumbnail {
        Thumbnail(Arc::new((*self.0).clone()))
    }

    /// True when both handles view the same underlying surface.
    pub fn shares_surface_with(&self, other: &Thumbnail) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Reference to one page of a loaded source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSource {
    /// Index into the store's source-document list (load order).
    pub doc_index: usize,
    /// 0-based page index within the source document.
    pub page_index: usize,
}

/// One visual slot in the page collection.
#[derive(Debug, Clone)]
pub struct PageRecord {
    /// `None` marks a synthetic blank page.
    pub source: Option<PageSource>,
    /// Rotation written into the exported page, normalized mod 360.
    pub rotation: Rotation,
    /// Rotation applied to the on-screen preview. Always changes together
    /// with `rotation`; kept as a separate field because one feeds the
    /// export transform and the other a CSS transform, and the UI reads
    /// them independently.
    pub display_rotation: Rotation,
    pub thumbnail: Thumbnail,
}

impl PageRecord {
    pub fn from_source(source: PageSource, thumbnail: Thumbnail) -> Self {
        Self {
            source: Some(source),
            rotation: Rotation::NONE,
            display_rotation: Rotation::NONE,
            thumbnail,
        }
    }

    pub fn blank(thumbnail: Thumbnail) -> Self {
        Self {
            source: None,
            rotation: Rotation::NONE,
            display_rotation: Rotation::NONE,
            thumbnail,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.source.is_none()
    }

    /// Apply a rotation delta to both the export and the display field.
    pub fn rotate(&mut self, delta: i32) {
        self.rotation = self.rotation.rotated_by(delta);
        self.display_rotation = self.display_rotation.rotated_by(delta);
    }

    /// Independent copy for duplication: same source and rotation, own
    /// thumbnail surface.
    pub fn duplicate(&self) -> PageRecord {
        PageRecord {
            thumbnail: self.thumbnail.detach(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::blank_page_surface;

    fn blank_record() -> PageRecord {
        PageRecord::blank(Thumbnail::new(blank_page_surface()))
    }

    #[test]
    fn test_rotation_sums_mod_360() {
        let mut r = Rotation::NONE;
        r = r.rotated_by(90);
        r = r.rotated_by(90);
        r = r.rotated_by(90);
        assert_eq!(r.degrees(), 270);
        r = r.rotated_by(90);
        assert_eq!(r.degrees(), 0);
    }

    #[test]
    fn test_rotation_negative_delta_wraps() {
        assert_eq!(Rotation::NONE.rotated_by(-90).degrees(), 270);
        assert_eq!(Rotation::from_degrees(-450).degrees(), 270);
    }

    #[test]
    fn test_rotate_keeps_both_fields_in_step() {
        let mut record = blank_record();
        record.rotate(90);
        record.rotate(90);
        assert_eq!(record.rotation.degrees(), 180);
        assert_eq!(record.display_rotation.degrees(), 180);
    }

    #[test]
    fn test_clone_shares_thumbnail_surface() {
        let record = blank_record();
        let copy = record.clone();
        assert!(record.thumbnail.shares_surface_with(&copy.thumbnail));
    }

    #[test]
    fn test_duplicate_detaches_thumbnail_surface() {
        let mut record = blank_record();
        record.rotate(90);
        let dup = record.duplicate();
        assert!(!record.thumbnail.shares_surface_with(&dup.thumbnail));
        assert_eq!(dup.rotation.degrees(), 90);
        assert_eq!(dup.source, record.source);
        // Same pixels, different allocation.
        assert_eq!(dup.thumbnail.surface().as_raw(), record.thumbnail.surface().as_raw());
    }

    #[test]
    fn test_rotating_duplicate_leaves_original_alone() {
        let record = blank_record();
        let mut dup = record.duplicate();
        dup.rotate(90);
        assert_eq!(record.rotation.degrees(), 0);
        assert_eq!(dup.rotation.degrees(), 90);
    }
}
