//! Overlay placement of pooled frames
//!
//! Alternative to reparenting frame nodes: every live frame sits in one
//! fixed overlay and is positioned over its block's placeholder. Losing the
//! placeholder only clears the rectangle; the frame itself is untouched.

use blockframe_pool::{MountId, PlaceholderId, Src};
use indexmap::IndexMap;
use serde::Serialize;

/// Viewport rectangle in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Measures placeholders on screen
pub trait LayoutProbe {
    /// Bounding rectangle of `placeholder`, `None` if it is not in the document
    fn bounding_rect(&self, placeholder: PlaceholderId) -> Option<Rect>;
}

/// Where one frame is drawn; `rect == None` hides it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub src: Src,
    pub rect: Option<Rect>,
}

#[derive(Debug, Clone)]
struct Slot {
    owner: Option<(MountId, PlaceholderId)>,
    rect: Option<Rect>,
}

/// Overlay slots keyed by `src`, in registration order
#[derive(Debug, Default)]
pub struct PortalLayer {
    slots: IndexMap<Src, Slot>,
}

impl PortalLayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `placeholder` as the position of `src`'s frame
    ///
    /// The newest registration wins if another mount still holds the slot.
    pub fn register(
        &mut self,
        src: Src,
        mount: MountId,
        placeholder: PlaceholderId,
        probe: &dyn LayoutProbe,
    ) -> Placement {
        let rect = probe.bounding_rect(placeholder);
        let slot = self.slots.entry(src.clone()).or_insert(Slot {
            owner: None,
            rect: None,
        });
        if let Some((previous, _)) = slot.owner {
            if previous != mount {
                tracing::debug!(%src, %previous, %mount, "overlay slot taken over");
            }
        }
        slot.owner = Some((mount, placeholder));
        slot.rect = rect;
        Placement { src, rect }
    }

    /// Stop tracking `src` for `mount`; the frame stays in the overlay, hidden
    ///
    /// Returns false if `mount` no longer holds the slot.
    pub fn unregister(&mut self, src: &Src, mount: MountId) -> bool {
        match self.slots.get_mut(src) {
            Some(slot) if slot.owner.is_some_and(|(owner, _)| owner == mount) => {
                slot.owner = None;
                slot.rect = None;
                true
            }
            _ => false,
        }
    }

    /// Re-measure every tracked placeholder
    ///
    /// Called on scroll, viewport resize and every animation frame. Returns
    /// only the placements whose rectangle changed.
    pub fn recompute(&mut self, probe: &dyn LayoutProbe) -> Vec<Placement> {
        let mut changed = Vec::new();
        for (src, slot) in &mut self.slots {
            let Some((_, placeholder)) = slot.owner else {
                continue;
            };
            let rect = probe.bounding_rect(placeholder);
            if rect != slot.rect {
                slot.rect = rect;
                changed.push(Placement {
                    src: src.clone(),
                    rect,
                });
            }
        }
        changed
    }

    /// Every frame in the overlay with its current rectangle
    #[must_use]
    pub fn placements(&self) -> Vec<Placement> {
        self.slots
            .iter()
            .map(|(src, slot)| Placement {
                src: src.clone(),
                rect: slot.rect,
            })
            .collect()
    }

    /// Drop the slot for `src` entirely, as when its frame is destroyed
    pub fn remove(&mut self, src: &Src) -> bool {
        self.slots.shift_remove(src).is_some()
    }

    #[must_use]
    pub fn owner(&self, src: &Src) -> Option<MountId> {
        self.slots.get(src)?.owner.map(|(mount, _)| mount)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeLayout(RefCell<HashMap<PlaceholderId, Rect>>);

    impl FakeLayout {
        fn place(&self, placeholder: u64, y: f64) {
            self.0
                .borrow_mut()
                .insert(PlaceholderId(placeholder), Rect::new(0.0, y, 640.0, 200.0));
        }

        fn remove(&self, placeholder: u64) {
            self.0.borrow_mut().remove(&PlaceholderId(placeholder));
        }
    }

    impl LayoutProbe for FakeLayout {
        fn bounding_rect(&self, placeholder: PlaceholderId) -> Option<Rect> {
            self.0.borrow().get(&placeholder).copied()
        }
    }

    fn src(raw: &str) -> Src {
        Src::new(raw).unwrap()
    }

    #[test]
    fn scroll_moves_only_changed_frames() {
        let layout = FakeLayout::default();
        layout.place(1, 0.0);
        layout.place(2, 300.0);

        let mut portal = PortalLayer::new();
        portal.register(src("a"), MountId::new(), PlaceholderId(1), &layout);
        portal.register(src("b"), MountId::new(), PlaceholderId(2), &layout);
        assert!(portal.recompute(&layout).is_empty());

        layout.place(1, -40.0);
        let changed = portal.recompute(&layout);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].src, src("a"));
        assert_eq!(changed[0].rect.map(|r| r.y), Some(-40.0));
    }

    #[test]
    fn unregister_hides_without_removing() {
        let layout = FakeLayout::default();
        layout.place(1, 0.0);
        let mut portal = PortalLayer::new();
        let mount = MountId::new();
        portal.register(src("a"), mount, PlaceholderId(1), &layout);

        assert!(portal.unregister(&src("a"), mount));
        assert_eq!(
            portal.placements(),
            vec![Placement {
                src: src("a"),
                rect: None
            }]
        );
        assert_eq!(portal.len(), 1);
    }

    #[test]
    fn newest_mount_owns_slot() {
        let layout = FakeLayout::default();
        layout.place(1, 0.0);
        layout.place(2, 500.0);
        let mut portal = PortalLayer::new();
        let (old, new) = (MountId::new(), MountId::new());

        portal.register(src("a"), old, PlaceholderId(1), &layout);
        portal.register(src("a"), new, PlaceholderId(2), &layout);

        // The late unmount of the old owner must not hide the new one.
        assert!(!portal.unregister(&src("a"), old));
        assert_eq!(portal.owner(&src("a")), Some(new));
        assert_eq!(portal.placements()[0].rect.map(|r| r.y), Some(500.0));
    }

    #[test]
    fn detached_placeholder_clears_rect() {
        let layout = FakeLayout::default();
        layout.place(1, 0.0);
        let mut portal = PortalLayer::new();
        portal.register(src("a"), MountId::new(), PlaceholderId(1), &layout);

        layout.remove(1);
        let changed = portal.recompute(&layout);
        assert_eq!(changed, vec![Placement { src: src("a"), rect: None }]);
    }
}
