//! Application state and its transition function.
//!
//! Every user action goes through [`reduce`], which mutates the state and
//! returns the side effects the caller must run afterwards (persistence,
//! recognition, notices). The reducer itself performs no I/O.

use crate::config::AppConfig;
use crate::error::InputError;
use crate::inventory::{FormField, InventoryItem, ItemForm, PackagingUnits};
use crate::ocr::{OcrError, Recognition};
use crate::selection::{
    fit_surface, map_pointer, DisplayRect, PixelRect, PointerInput, SelectionOutcome,
    SelectionTracker, SurfaceSize, ViewportTransform,
};

/// Unit used when the unit set is somehow empty.
const FALLBACK_UNIT: &str = "카톤";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Start,
    Capture,
    Annotate,
    List,
}

/// Something the user (or a finished recognition) did.
#[derive(Clone, Debug)]
pub enum Action {
    StartCapture,
    /// A new Source Bitmap of the given intrinsic size is on screen.
    ImageLoaded { width: u32, height: u32 },
    /// The container around the surface changed size.
    ContainerResized { width: f64, height: f64 },
    /// Drop the image and go back to capture.
    Retake,
    PointerDown(PointerInput, DisplayRect),
    PointerMove(PointerInput, DisplayRect),
    /// Release; the position is optional since touch-end carries none.
    PointerUp(Option<PointerInput>, DisplayRect),
    Zoom { focus_x: f64, focus_y: f64, factor: f64 },
    Pan { dx: f64, dy: f64 },
    Reselect,
    RequestRecognition,
    RecognitionFinished {
        generation: u64,
        result: Result<Recognition, OcrError>,
    },
    EditForm(FormField, String),
    SubmitItem,
    ShowList,
    /// 0-based index into the list
    DeleteItem(usize),
    ClearItems,
    AddUnit(String),
    RemoveUnit(String),
    SaveUnits(Vec<String>),
}

/// Work the caller must do after a transition, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    PersistItems,
    PersistUnits,
    /// Recognize `rect` of the current surface; `generation` identifies the image.
    Recognize { generation: u64, rect: PixelRect },
    Notify(String),
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub screen: Screen,
    /// Bumped on every image load or retake; stale recognitions carry an old value.
    pub image_generation: u64,
    pub image_size: Option<(u32, u32)>,
    pub surface: Option<SurfaceSize>,
    pub viewport: ViewportTransform,
    pub tracker: SelectionTracker,
    pub form: ItemForm,
    pub recognition: Option<Recognition>,
    /// A recognition request is outstanding
    pub busy: bool,
    pub items: Vec<InventoryItem>,
    pub units: PackagingUnits,
    /// Messages waiting to be shown
    pub notices: Vec<String>,
    config: AppConfig,
}

impl AppState {
    pub fn new(items: Vec<InventoryItem>, units: PackagingUnits, config: &AppConfig) -> Self {
        let form = ItemForm::with_unit(units.first().unwrap_or(FALLBACK_UNIT));
        Self {
            screen: Screen::Start,
            image_generation: 0,
            image_size: None,
            surface: None,
            viewport: ViewportTransform::with_zoom(config.viewport.default_zoom),
            tracker: SelectionTracker::new(config.selection.min_size_px),
            form,
            recognition: None,
            busy: false,
            items,
            units,
            notices: Vec::new(),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Removes and returns pending notices.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    fn default_unit(&self) -> String {
        self.units.first().unwrap_or(FALLBACK_UNIT).to_string()
    }

    fn clear_form(&mut self) {
        self.form = ItemForm::with_unit(&self.default_unit());
    }

    fn mapped(&self, pointer: &PointerInput, rect: &DisplayRect) -> Result<(f64, f64), InputError> {
        let surface = self.surface.ok_or(InputError::NoImage)?;
        Ok(map_pointer(pointer, rect, surface, &self.viewport))
    }

    /// Marks recognition as outstanding and builds its effect.
    fn start_recognition(&mut self, rect: PixelRect) -> Effect {
        self.busy = true;
        Effect::Recognize {
            generation: self.image_generation,
            rect,
        }
    }
}

/// Applies one action.
///
/// On `Err` the state is left as it was, except that a too-small drag is
/// discarded (the tracker is back to idle).
pub fn reduce(state: &mut AppState, action: Action) -> Result<Vec<Effect>, InputError> {
    match action {
        Action::StartCapture => {
            state.screen = Screen::Capture;
            Ok(Vec::new())
        }

        Action::ImageLoaded { width, height } => {
            let viewport = &state.config.viewport;
            state.image_generation += 1;
            state.image_size = Some((width, height));
            state.surface = Some(fit_surface(
                width,
                height,
                viewport.container_width,
                viewport.container_height,
            ));
            state.viewport = ViewportTransform::with_zoom(viewport.default_zoom);
            state.tracker.reset();
            state.tracker.set_active(true);
            state.recognition = None;
            state.busy = false;
            state.clear_form();
            state.screen = Screen::Annotate;
            crate::log(&format!(
                "Image {}x{} loaded (generation {})",
                width, height, state.image_generation
            ));
            Ok(Vec::new())
        }

        Action::ContainerResized { width, height } => {
            if !(width > 0.0 && height > 0.0) {
                crate::log(&format!("Ignoring container resize to {}x{}", width, height));
                return Ok(Vec::new());
            }
            state.config.viewport.container_width = width;
            state.config.viewport.container_height = height;

            if let Some((image_w, image_h)) = state.image_size {
                state.surface = Some(fit_surface(image_w, image_h, width, height));
                // Any selection was made in the old surface coordinates
                state.tracker.reset();
                crate::log(&format!(
                    "Surface refitted to {:.1}x{:.1} container",
                    width, height
                ));
            }
            Ok(Vec::new())
        }

        Action::Retake => {
            state.image_generation += 1;
            state.image_size = None;
            state.surface = None;
            state.tracker.reset();
            state.tracker.set_active(false);
            state.recognition = None;
            state.busy = false;
            state.screen = Screen::Capture;
            Ok(Vec::new())
        }

        Action::PointerDown(pointer, rect) => {
            let point = state.mapped(&pointer, &rect)?;
            state.tracker.pointer_down(point);
            Ok(Vec::new())
        }

        Action::PointerMove(pointer, rect) => {
            let point = state.mapped(&pointer, &rect)?;
            state.tracker.pointer_move(point);
            Ok(Vec::new())
        }

        Action::PointerUp(pointer, rect) => {
            let point = match pointer {
                Some(p) => Some(state.mapped(&p, &rect)?),
                None => None,
            };

            match state.tracker.pointer_up(point) {
                SelectionOutcome::Ignored => Ok(Vec::new()),
                SelectionOutcome::TooSmall => {
                    crate::log("Selection discarded: too small");
                    Err(InputError::SelectionTooSmall {
                        min: state.config.selection.min_size_px,
                    })
                }
                SelectionOutcome::Committed(selection) => {
                    crate::log(&format!(
                        "Selection committed: ({:.1},{:.1})-({:.1},{:.1})",
                        selection.x0, selection.y0, selection.x1, selection.y1
                    ));
                    // Releasing a selection starts recognition right away
                    if state.busy {
                        return Ok(vec![Effect::Notify(
                            InputError::RecognitionInProgress.to_string(),
                        )]);
                    }
                    Ok(vec![state.start_recognition(selection.to_pixel_rect())])
                }
            }
        }

        Action::Zoom {
            focus_x,
            focus_y,
            factor,
        } => {
            let viewport = &state.config.viewport;
            state.viewport.zoom_at(
                focus_x,
                focus_y,
                factor,
                viewport.min_zoom,
                viewport.max_zoom,
            );
            Ok(Vec::new())
        }

        Action::Pan { dx, dy } => {
            state.viewport.pan_by(dx, dy);
            Ok(Vec::new())
        }

        Action::Reselect => {
            state.tracker.reselect();
            state.recognition = None;
            Ok(Vec::new())
        }

        Action::RequestRecognition => {
            if state.busy {
                return Err(InputError::RecognitionInProgress);
            }
            if state.surface.is_none() {
                return Err(InputError::NoImage);
            }
            let selection = state.tracker.committed().ok_or(InputError::NoSelection)?;
            Ok(vec![state.start_recognition(selection.to_pixel_rect())])
        }

        Action::RecognitionFinished { generation, result } => {
            if generation != state.image_generation {
                crate::log(&format!(
                    "Discarding recognition for generation {} (current {})",
                    generation, state.image_generation
                ));
                return Ok(Vec::new());
            }
            state.busy = false;

            match result {
                Ok(recognition) => {
                    let mut effects = Vec::new();
                    if recognition.extracted_code.is_empty() {
                        effects.push(Effect::Notify(
                            "품번을 인식하지 못했습니다. 직접 입력해주세요".to_string(),
                        ));
                    } else {
                        state.form.product_number = recognition.extracted_code.clone();
                    }
                    state.recognition = Some(recognition);
                    Ok(effects)
                }
                Err(e) => Ok(vec![Effect::Notify(format!(
                    "텍스트 인식에 실패했습니다. 품번을 직접 입력해주세요 ({})",
                    e
                ))]),
            }
        }

        Action::EditForm(field, value) => {
            state.form.set(field, value);
            Ok(Vec::new())
        }

        Action::SubmitItem => {
            let item = state.form.validate()?;
            crate::log(&format!(
                "Item added: {} x{} {}",
                item.product_number, item.quantity, item.unit
            ));
            state.items.push(item);
            state.clear_form();
            state.screen = Screen::List;
            Ok(vec![Effect::PersistItems])
        }

        Action::ShowList => {
            state.screen = Screen::List;
            Ok(Vec::new())
        }

        Action::DeleteItem(index) => {
            if index >= state.items.len() {
                return Err(InputError::NoSuchItem(index + 1));
            }
            let removed = state.items.remove(index);
            crate::log(&format!("Item deleted: {}", removed.product_number));
            Ok(vec![Effect::PersistItems])
        }

        Action::ClearItems => {
            state.items.clear();
            Ok(vec![Effect::PersistItems])
        }

        Action::AddUnit(label) => {
            if state.units.add(&label)? {
                Ok(vec![Effect::PersistUnits])
            } else {
                Ok(Vec::new())
            }
        }

        Action::RemoveUnit(label) => {
            if state.units.remove(&label) {
                Ok(vec![Effect::PersistUnits])
            } else {
                Ok(Vec::new())
            }
        }

        Action::SaveUnits(labels) => {
            state.units.replace_all(labels);
            if !state.units.contains(&state.form.unit) {
                state.form.unit = state.default_unit();
            }
            Ok(vec![Effect::PersistUnits])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::render_report;

    fn state() -> AppState {
        AppState::new(Vec::new(), PackagingUnits::default(), &AppConfig::default())
    }

    /// Loaded 390x640 image shown at its pixel size with no viewport transform.
    fn annotating() -> (AppState, DisplayRect) {
        let mut s = state();
        reduce(&mut s, Action::ImageLoaded { width: 390, height: 640 }).unwrap();
        let surface = s.surface.unwrap();
        (s, DisplayRect::unscaled(surface))
    }

    fn drag(s: &mut AppState, rect: DisplayRect, from: (f64, f64), to: (f64, f64)) -> Result<Vec<Effect>, InputError> {
        reduce(s, Action::PointerDown(PointerInput::mouse(from.0, from.1), rect))?;
        reduce(s, Action::PointerMove(PointerInput::mouse(to.0, to.1), rect))?;
        reduce(s, Action::PointerUp(None, rect))
    }

    fn fill_form(s: &mut AppState, code: &str, qty: &str, unit: &str, expiry: &str) {
        reduce(s, Action::EditForm(FormField::ProductNumber, code.into())).unwrap();
        reduce(s, Action::EditForm(FormField::Quantity, qty.into())).unwrap();
        reduce(s, Action::EditForm(FormField::Unit, unit.into())).unwrap();
        reduce(s, Action::EditForm(FormField::ExpiryDate, expiry.into())).unwrap();
    }

    fn recognition(code: &str) -> Recognition {
        Recognition {
            raw_text: code.into(),
            extracted_code: code.into(),
            engine: "remote".into(),
        }
    }

    #[test]
    fn test_image_load_resets_viewport_and_selection() {
        let (mut s, rect) = annotating();
        reduce(&mut s, Action::Zoom { focus_x: 10.0, focus_y: 10.0, factor: 2.0 }).unwrap();
        reduce(&mut s, Action::Pan { dx: 5.0, dy: 5.0 }).unwrap();
        drag(&mut s, rect, (10.0, 10.0), (50.0, 40.0)).unwrap();

        reduce(&mut s, Action::ImageLoaded { width: 800, height: 600 }).unwrap();

        assert_eq!(s.viewport, ViewportTransform::identity());
        assert!(s.tracker.current().is_none());
        assert!(s.tracker.is_active());
        assert_eq!(s.image_generation, 2);
        assert_eq!(s.screen, Screen::Annotate);
    }

    #[test]
    fn test_drag_after_zoom_and_pan_maps_to_surface() {
        let (mut s, rect) = annotating();
        reduce(&mut s, Action::Zoom { focus_x: 0.0, focus_y: 0.0, factor: 2.0 }).unwrap();
        reduce(&mut s, Action::Pan { dx: 10.0, dy: 10.0 }).unwrap();

        // element = surface * 2 + 10
        let effects = drag(&mut s, rect, (30.0, 30.0), (110.0, 90.0)).unwrap();

        assert_eq!(
            effects,
            vec![Effect::Recognize {
                generation: 1,
                rect: PixelRect::new(10, 10, 40, 30),
            }]
        );
    }

    #[test]
    fn test_container_resize_refits_surface() {
        let (mut s, rect) = annotating();
        drag(&mut s, rect, (10.0, 10.0), (50.0, 40.0)).unwrap();
        reduce(&mut s, Action::RecognitionFinished { generation: 1, result: Ok(recognition("1")) }).unwrap();

        let effects = reduce(&mut s, Action::ContainerResized { width: 195.0, height: 320.0 }).unwrap();

        assert!(effects.is_empty());
        assert_eq!(s.surface, Some(SurfaceSize::new(195.0, 320.0)));
        assert_eq!(s.config().viewport.container_width, 195.0);
        assert!(s.tracker.current().is_none());
        assert!(s.tracker.is_active());

        // A new drag is accepted in the refitted surface
        let rect = DisplayRect::unscaled(SurfaceSize::new(195.0, 320.0));
        assert_eq!(drag(&mut s, rect, (10.0, 10.0), (50.0, 40.0)).unwrap().len(), 1);
    }

    #[test]
    fn test_container_resize_ignores_empty_size() {
        let (mut s, _) = annotating();
        reduce(&mut s, Action::ContainerResized { width: 0.0, height: 320.0 }).unwrap();

        assert_eq!(s.surface, Some(SurfaceSize::new(390.0, 640.0)));
        assert_eq!(s.config().viewport.container_width, 390.0);
    }

    #[test]
    fn test_container_resize_without_image_keeps_size_for_next_load() {
        let mut s = state();
        reduce(&mut s, Action::ContainerResized { width: 195.0, height: 320.0 }).unwrap();
        assert!(s.surface.is_none());

        reduce(&mut s, Action::ImageLoaded { width: 390, height: 640 }).unwrap();
        assert_eq!(s.surface, Some(SurfaceSize::new(195.0, 320.0)));
    }

    #[test]
    fn test_small_drag_is_discarded() {
        let (mut s, rect) = annotating();
        let err = drag(&mut s, rect, (10.0, 10.0), (12.0, 11.0)).unwrap_err();
        assert_eq!(err, InputError::SelectionTooSmall { min: 10.0 });
        assert!(s.tracker.current().is_none());
        assert!(!s.busy);
    }

    #[test]
    fn test_commit_requests_recognition() {
        let (mut s, rect) = annotating();
        let effects = drag(&mut s, rect, (50.0, 40.0), (10.0, 10.0)).unwrap();

        assert_eq!(
            effects,
            vec![Effect::Recognize {
                generation: 1,
                rect: PixelRect::new(10, 10, 40, 30),
            }]
        );
        assert!(s.busy);
    }

    #[test]
    fn test_pointer_requires_image() {
        let mut s = state();
        let rect = DisplayRect::new(0.0, 0.0, 100.0, 100.0);
        let err = reduce(&mut s, Action::PointerDown(PointerInput::touch(1.0, 1.0), rect)).unwrap_err();
        assert_eq!(err, InputError::NoImage);
    }

    #[test]
    fn test_request_while_busy_is_rejected() {
        let (mut s, rect) = annotating();
        drag(&mut s, rect, (10.0, 10.0), (50.0, 40.0)).unwrap();

        let err = reduce(&mut s, Action::RequestRecognition).unwrap_err();
        assert_eq!(err, InputError::RecognitionInProgress);
    }

    #[test]
    fn test_request_without_selection() {
        let (mut s, _) = annotating();
        let err = reduce(&mut s, Action::RequestRecognition).unwrap_err();
        assert_eq!(err, InputError::NoSelection);
    }

    #[test]
    fn test_recognition_fills_product_number() {
        let (mut s, rect) = annotating();
        drag(&mut s, rect, (10.0, 10.0), (50.0, 40.0)).unwrap();

        let effects = reduce(
            &mut s,
            Action::RecognitionFinished { generation: 1, result: Ok(recognition("12345")) },
        )
        .unwrap();

        assert!(effects.is_empty());
        assert_eq!(s.form.product_number, "12345");
        assert!(!s.busy);
    }

    #[test]
    fn test_recognition_failure_keeps_field() {
        let (mut s, rect) = annotating();
        reduce(&mut s, Action::EditForm(FormField::ProductNumber, "typed".into())).unwrap();
        drag(&mut s, rect, (10.0, 10.0), (50.0, 40.0)).unwrap();

        let effects = reduce(
            &mut s,
            Action::RecognitionFinished {
                generation: 1,
                result: Err(OcrError::failed("tesseract", "not installed")),
            },
        )
        .unwrap();

        assert_eq!(effects.len(), 1);
        assert!(matches!(&effects[0], Effect::Notify(msg) if msg.contains("not installed")));
        assert_eq!(s.form.product_number, "typed");
        assert!(!s.busy);
    }

    #[test]
    fn test_stale_recognition_is_discarded() {
        let (mut s, rect) = annotating();
        drag(&mut s, rect, (10.0, 10.0), (50.0, 40.0)).unwrap();
        reduce(&mut s, Action::Retake).unwrap();
        reduce(&mut s, Action::ImageLoaded { width: 390, height: 640 }).unwrap();

        let effects = reduce(
            &mut s,
            Action::RecognitionFinished { generation: 1, result: Ok(recognition("999")) },
        )
        .unwrap();

        assert!(effects.is_empty());
        assert_eq!(s.form.product_number, "");
        assert!(s.recognition.is_none());
    }

    #[test]
    fn test_reselect_allows_new_drag() {
        let (mut s, rect) = annotating();
        drag(&mut s, rect, (10.0, 10.0), (50.0, 40.0)).unwrap();
        reduce(&mut s, Action::RecognitionFinished { generation: 1, result: Ok(recognition("1")) }).unwrap();

        // A committed selection ignores new drags until reselect
        assert!(drag(&mut s, rect, (100.0, 100.0), (200.0, 200.0)).unwrap().is_empty());

        reduce(&mut s, Action::Reselect).unwrap();
        let effects = drag(&mut s, rect, (100.0, 100.0), (200.0, 200.0)).unwrap();
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn test_invalid_submit_leaves_state_unchanged() {
        let (mut s, _) = annotating();
        fill_form(&mut s, "", "5", "카톤", "");

        let err = reduce(&mut s, Action::SubmitItem).unwrap_err();

        assert_eq!(err, InputError::MissingProductNumber);
        assert!(s.items.is_empty());
        assert_eq!(s.form.quantity, "5");
        assert_eq!(s.screen, Screen::Annotate);
    }

    #[test]
    fn test_add_export_delete() {
        let (mut s, _) = annotating();
        fill_form(&mut s, "88881234", "5", "카톤", "20251201");

        let effects = reduce(&mut s, Action::SubmitItem).unwrap();
        assert_eq!(effects, vec![Effect::PersistItems]);
        assert_eq!(s.screen, Screen::List);
        assert_eq!(s.form, ItemForm::with_unit("카톤"));
        assert_eq!(
            render_report(&s.items).as_deref(),
            Some("88881234 | 5 | 카톤 | 20251201")
        );

        let effects = reduce(&mut s, Action::DeleteItem(0)).unwrap();
        assert_eq!(effects, vec![Effect::PersistItems]);
        assert_eq!(render_report(&s.items), None);
    }

    #[test]
    fn test_delete_out_of_range() {
        let mut s = state();
        assert_eq!(reduce(&mut s, Action::DeleteItem(0)), Err(InputError::NoSuchItem(1)));
    }

    #[test]
    fn test_unit_actions() {
        let mut s = state();

        assert_eq!(reduce(&mut s, Action::AddUnit("박스".into())).unwrap(), vec![Effect::PersistUnits]);
        assert_eq!(s.units.as_slice(), &["카톤", "중포", "박스"]);

        // Duplicate: nothing to persist
        assert!(reduce(&mut s, Action::AddUnit("박스".into())).unwrap().is_empty());
        assert_eq!(reduce(&mut s, Action::AddUnit(" ".into())), Err(InputError::EmptyUnit));

        reduce(&mut s, Action::SaveUnits(vec!["팔레트".into()])).unwrap();
        assert_eq!(s.units.as_slice(), &["팔레트"]);
        assert_eq!(s.form.unit, "팔레트");
    }
}
