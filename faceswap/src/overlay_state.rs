use crate::affine_transform::AffineTransform;
use crate::anchor_transform::PlacedOverlay;
use crate::point::Point2D;

/// The overlays placed on one photo and which of them is being edited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayEditorState {
    pub placed: Vec<PlacedOverlay>,
    pub selected: Option<usize>,
}

/// Edits applied to an [`OverlayEditorState`] through [`reduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayAction {
    /// Appends an overlay and selects it.
    Add(PlacedOverlay),
    Select(usize),
    /// Removes an overlay; the previous one (or the first) becomes selected.
    Remove(usize),
    /// Changes the given fields of the selected overlay.
    Update {
        offset_x: Option<f32>,
        offset_y: Option<f32>,
        scale: Option<f32>,
        rotation: Option<f32>,
    },
    /// Puts the selected overlay back at zero offset, unit scale and no rotation.
    ResetSelected,
    Clear,
}

/// Applies `action` to `state`, returning the new state.
///
/// Out-of-range indices leave the state as it was.
///
/// # Examples
/// ```
/// # use faceswap::overlay_state::{reduce, OverlayAction, OverlayEditorState};
/// # use faceswap::anchor_transform::{OverlayAsset, OverlayCategory, PlacedOverlay};
/// let hat = PlacedOverlay::new(OverlayCategory::Hat, OverlayAsset::new("hat", 64, 64));
/// let state = reduce(OverlayEditorState::default(), OverlayAction::Add(hat));
/// let state = reduce(state, OverlayAction::Update { offset_x: Some(4.0), offset_y: None, scale: None, rotation: None });
/// assert_eq!(state.selected, Some(0));
/// assert_eq!(state.placed[0].offset_x, 4.0);
/// ```
pub fn reduce(mut state: OverlayEditorState, action: OverlayAction) -> OverlayEditorState {
    match action {
        OverlayAction::Add(overlay) => {
            state.placed.push(overlay);
            state.selected = Some(state.placed.len() - 1);
        }
        OverlayAction::Select(index) => {
            if index < state.placed.len() {
                state.selected = Some(index);
            }
        }
        OverlayAction::Remove(index) => {
            if index < state.placed.len() {
                state.placed.remove(index);
                state.selected = if state.placed.is_empty() {
                    None
                } else {
                    Some(index.saturating_sub(1))
                };
            }
        }
        OverlayAction::Update {
            offset_x,
            offset_y,
            scale,
            rotation,
        } => {
            if let Some(overlay) = state.selected_mut() {
                overlay.offset_x = offset_x.unwrap_or(overlay.offset_x);
                overlay.offset_y = offset_y.unwrap_or(overlay.offset_y);
                overlay.scale = scale.map(|s| s.max(0.0)).unwrap_or(overlay.scale);
                overlay.rotation = rotation.unwrap_or(overlay.rotation);
            }
        }
        OverlayAction::ResetSelected => {
            if let Some(overlay) = state.selected_mut() {
                overlay.offset_x = 0.0;
                overlay.offset_y = 0.0;
                overlay.scale = 1.0;
                overlay.rotation = 0.0;
            }
        }
        OverlayAction::Clear => state = OverlayEditorState::default(),
    }
    state
}

impl OverlayEditorState {
    pub fn selected_overlay(&self) -> Option<&PlacedOverlay> {
        self.selected.and_then(|i| self.placed.get(i))
    }

    fn selected_mut(&mut self) -> Option<&mut PlacedOverlay> {
        self.selected.and_then(|i| self.placed.get_mut(i))
    }

    /// Placement transform of every overlay, in placement order.
    pub fn transforms(&self, landmarks: &[Point2D]) -> Vec<AffineTransform> {
        self.placed.iter().map(|overlay| overlay.transform(landmarks)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor_transform::{OverlayAsset, OverlayCategory};

    fn overlay(id: &str) -> PlacedOverlay {
        PlacedOverlay::new(OverlayCategory::Glasses, OverlayAsset::new(id, 40, 20))
    }

    fn with_three() -> OverlayEditorState {
        ["a", "b", "c"]
            .into_iter()
            .fold(OverlayEditorState::default(), |s, id| reduce(s, OverlayAction::Add(overlay(id))))
    }

    #[test]
    fn adding_selects_the_newest() {
        let state = with_three();
        assert_eq!(state.placed.len(), 3);
        assert_eq!(state.selected, Some(2));
        assert_eq!(state.selected_overlay().map(|o| o.asset.id.as_str()), Some("c"));
    }

    #[test]
    fn removing_selects_the_previous_overlay() {
        let state = reduce(with_three(), OverlayAction::Remove(2));
        assert_eq!(state.selected, Some(1));
        let state = reduce(state, OverlayAction::Remove(0));
        assert_eq!(state.selected, Some(0));
        assert_eq!(state.placed[0].asset.id, "b");
        let state = reduce(state, OverlayAction::Remove(0));
        assert_eq!(state.selected, None);
        assert!(state.placed.is_empty());
    }

    #[test]
    fn out_of_range_indices_are_ignored() {
        let state = with_three();
        assert_eq!(reduce(state.clone(), OverlayAction::Select(7)), state);
        assert_eq!(reduce(state.clone(), OverlayAction::Remove(3)), state);
    }

    #[test]
    fn update_and_reset_touch_only_the_selection() {
        let state = reduce(with_three(), OverlayAction::Select(1));
        let state = reduce(
            state,
            OverlayAction::Update {
                offset_x: Some(3.0),
                offset_y: Some(-2.0),
                scale: Some(-1.0),
                rotation: Some(45.0),
            },
        );
        let edited = &state.placed[1];
        assert_eq!((edited.offset_x, edited.offset_y, edited.scale, edited.rotation), (3.0, -2.0, 0.0, 45.0));
        assert_eq!(state.placed[0], overlay("a"));

        let state = reduce(state, OverlayAction::ResetSelected);
        assert_eq!(state.placed[1], overlay("b"));
    }

    #[test]
    fn update_without_selection_is_a_no_op() {
        let state = OverlayEditorState {
            placed: vec![overlay("a")],
            selected: None,
        };
        let next = reduce(
            state.clone(),
            OverlayAction::Update {
                offset_x: Some(1.0),
                offset_y: None,
                scale: None,
                rotation: None,
            },
        );
        assert_eq!(next, state);
    }

    #[test]
    fn clear_and_transforms() {
        let state = with_three();
        let mut landmarks = vec![Point2D::default(); 468];
        landmarks[33] = Point2D::new(10.0, 10.0);
        landmarks[263] = Point2D::new(30.0, 10.0);
        let transforms = state.transforms(&landmarks);
        assert_eq!(transforms.len(), 3);
        assert!(transforms.iter().all(|t| (t.scale_factor() - 1.0).abs() < 1e-5));
        assert_eq!(reduce(state, OverlayAction::Clear), OverlayEditorState::default());
    }
}
