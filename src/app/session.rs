//! Effect runner around the application state.
//!
//! A `Session` owns the state, the storage it persists to, the rendered
//! Display Surface and the OCR engines. `dispatch` reduces an action and
//! then runs the resulting effects in order.

use image::RgbaImage;
use std::collections::VecDeque;

use super::state::{reduce, Action, AppState, Effect};
use crate::capture::{render_surface, SourceImage};
use crate::config::AppConfig;
use crate::error::InputError;
use crate::inventory::{
    export_items, load_items, load_units, save_items, save_units, Delivered, DeliveryChannel,
    DeliveryError, Storage,
};
use crate::log;
use crate::ocr::{engines_from_config, recognize_region, OcrEngine, OcrError, Recognition};
use crate::selection::PixelRect;

pub struct Session<S: Storage> {
    state: AppState,
    storage: S,
    source: Option<SourceImage>,
    surface: Option<RgbaImage>,
    primary: Option<Box<dyn OcrEngine>>,
    fallback: Option<Box<dyn OcrEngine>>,
}

impl<S: Storage> Session<S> {
    /// Reads the persisted list and units once and builds the configured engines.
    pub fn open(storage: S, config: &AppConfig) -> Self {
        let items = load_items(&storage);
        let units = load_units(&storage);
        log(&format!(
            "Session opened: {} items, {} units",
            items.len(),
            units.len()
        ));

        let (primary, fallback) = engines_from_config(&config.ocr);
        Self {
            state: AppState::new(items, units, config),
            storage,
            source: None,
            surface: None,
            primary,
            fallback,
        }
    }

    /// Replaces the OCR engines.
    pub fn with_engines(
        mut self,
        primary: Option<Box<dyn OcrEngine>>,
        fallback: Option<Box<dyn OcrEngine>>,
    ) -> Self {
        self.primary = primary;
        self.fallback = fallback;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The rendered Display Surface of the current image.
    pub fn surface(&self) -> Option<&RgbaImage> {
        self.surface.as_ref()
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        self.state.take_notices()
    }

    /// Shows a new Source Bitmap: fits and renders the surface, resets the viewport.
    pub fn load_image(&mut self, source: &SourceImage) -> Result<(), InputError> {
        let (width, height) = source.dimensions();
        log(&format!("Showing {} ({}x{})", source.origin, width, height));
        self.dispatch(Action::ImageLoaded { width, height })?;

        self.source = Some(source.clone());
        self.render();
        Ok(())
    }

    /// Applies an action and runs its effects.
    pub fn dispatch(&mut self, action: Action) -> Result<(), InputError> {
        let resized = matches!(action, Action::ContainerResized { .. });
        if matches!(action, Action::Retake) {
            self.source = None;
            self.surface = None;
        }
        let effects = reduce(&mut self.state, action)?;
        if resized {
            self.render();
        }
        self.run_effects(effects);
        Ok(())
    }

    /// Renders the current source at the current surface size.
    fn render(&mut self) {
        self.surface = match (&self.source, self.state.surface) {
            (Some(source), Some(size)) => Some(render_surface(source, size)),
            _ => None,
        };
    }

    /// Exports the current list through the given channels.
    pub fn export(&self, channels: &[Box<dyn DeliveryChannel>]) -> Result<Delivered, DeliveryError> {
        export_items(&self.state.items, channels)
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::PersistItems => {
                    if let Err(e) = save_items(&self.storage, &self.state.items) {
                        self.warn_persist_failure("재고 목록", &e);
                    }
                }
                Effect::PersistUnits => {
                    if let Err(e) = save_units(&self.storage, &self.state.units) {
                        self.warn_persist_failure("포장 단위", &e);
                    }
                }
                Effect::Recognize { generation, rect } => {
                    let result = self.recognize(rect);
                    match reduce(
                        &mut self.state,
                        Action::RecognitionFinished { generation, result },
                    ) {
                        Ok(more) => queue.extend(more),
                        Err(e) => log(&format!("Recognition result rejected: {}", e)),
                    }
                }
                Effect::Notify(message) => {
                    log(&format!("Notice: {}", message));
                    self.state.notices.push(message);
                }
            }
        }
    }

    fn recognize(&self, rect: PixelRect) -> Result<Recognition, OcrError> {
        let surface = self
            .surface
            .as_ref()
            .ok_or_else(|| OcrError::failed("session", "no image loaded"))?;
        let primary = self
            .primary
            .as_deref()
            .ok_or_else(|| OcrError::failed("session", "no OCR engine configured"))?;

        recognize_region(
            surface,
            rect,
            primary,
            self.fallback.as_deref(),
            self.state.config(),
        )
    }

    fn warn_persist_failure(&mut self, what: &str, error: &anyhow::Error) {
        log(&format!("Warning: failed to save {}: {:#}", what, error));
        self.state.notices.push(format!(
            "{} 저장에 실패했습니다. 변경 내용이 다음 실행 때 사라질 수 있습니다 ({})",
            what, error
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::store::{ITEMS_KEY, UNITS_KEY};
    use crate::inventory::{FormField, MemoryStorage};
    use crate::ocr::testing::FakeEngine;
    use crate::selection::{DisplayRect, PointerInput};
    use image::{ImageBuffer, Rgba};

    fn photo() -> SourceImage {
        SourceImage::new("test", ImageBuffer::from_pixel(780, 1280, Rgba([255, 255, 255, 255])))
    }

    fn session_with(
        storage: MemoryStorage,
        primary: FakeEngine,
        fallback: Option<FakeEngine>,
    ) -> Session<MemoryStorage> {
        Session::open(storage, &AppConfig::default()).with_engines(
            Some(Box::new(primary)),
            fallback.map(|f| Box::new(f) as Box<dyn OcrEngine>),
        )
    }

    /// Drags over a 40x30 region of the 390x640 surface.
    fn select_region(session: &mut Session<MemoryStorage>) {
        let surface = session.state().surface.unwrap();
        let rect = DisplayRect::unscaled(surface);
        session
            .dispatch(Action::PointerDown(PointerInput::mouse(10.0, 10.0), rect))
            .unwrap();
        session
            .dispatch(Action::PointerMove(PointerInput::mouse(50.0, 40.0), rect))
            .unwrap();
        session.dispatch(Action::PointerUp(None, rect)).unwrap();
    }

    #[test]
    fn test_open_reads_persisted_state() {
        let storage = MemoryStorage::new()
            .with_value(
                ITEMS_KEY,
                r#"[{"productNumber":"A1","quantity":"3","unit":"중포"}]"#,
            )
            .with_value(UNITS_KEY, r#"["박스"]"#);

        let session = session_with(storage, FakeEngine::ok("remote", ""), None);

        assert_eq!(session.state().items.len(), 1);
        assert_eq!(session.state().items[0].quantity, 3);
        assert_eq!(session.state().units.as_slice(), &["박스"]);
        assert_eq!(session.state().form.unit, "박스");
    }

    #[test]
    fn test_load_image_renders_fitted_surface() {
        let mut session = session_with(MemoryStorage::new(), FakeEngine::ok("remote", ""), None);
        session.load_image(&photo()).unwrap();

        assert_eq!(session.surface().unwrap().dimensions(), (390, 640));
    }

    #[test]
    fn test_container_resize_rerenders_surface() {
        let mut session = session_with(
            MemoryStorage::new(),
            FakeEngine::ok("remote", "88881234"),
            None,
        );
        session.load_image(&photo()).unwrap();

        session
            .dispatch(Action::ContainerResized { width: 195.0, height: 320.0 })
            .unwrap();
        assert_eq!(session.surface().unwrap().dimensions(), (195, 320));

        // Recognition still runs against the re-rendered surface
        select_region(&mut session);
        assert_eq!(session.state().form.product_number, "88881234");
    }

    #[test]
    fn test_selection_runs_recognition() {
        let mut session = session_with(
            MemoryStorage::new(),
            FakeEngine::ok("remote", "LOT-A / 88881234"),
            None,
        );
        session.load_image(&photo()).unwrap();

        select_region(&mut session);

        let state = session.state();
        assert!(!state.busy);
        assert_eq!(state.form.product_number, "88881234");
        assert_eq!(state.recognition.as_ref().unwrap().engine, "remote");
    }

    #[test]
    fn test_fallback_engine_used_on_failure() {
        let mut session = session_with(
            MemoryStorage::new(),
            FakeEngine::failing("remote"),
            Some(FakeEngine::ok("tesseract", "ABC")),
        );
        session.load_image(&photo()).unwrap();

        select_region(&mut session);

        assert_eq!(session.state().form.product_number, "ABC");
        assert_eq!(session.state().recognition.as_ref().unwrap().engine, "tesseract");
    }

    #[test]
    fn test_recognition_failure_becomes_notice() {
        let mut session = session_with(
            MemoryStorage::new(),
            FakeEngine::failing("remote"),
            Some(FakeEngine::failing("tesseract")),
        );
        session.load_image(&photo()).unwrap();
        session
            .dispatch(Action::EditForm(FormField::ProductNumber, "manual".into()))
            .unwrap();

        select_region(&mut session);

        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(session.state().form.product_number, "manual");
        assert!(!session.state().busy);

        // Recognition failure never blocks adding the item
        session
            .dispatch(Action::EditForm(FormField::Quantity, "2".into()))
            .unwrap();
        session.dispatch(Action::SubmitItem).unwrap();
        assert_eq!(session.state().items.len(), 1);
    }

    #[test]
    fn test_items_persisted_after_each_mutation() {
        let mut session = session_with(MemoryStorage::new(), FakeEngine::ok("remote", ""), None);
        session
            .dispatch(Action::EditForm(FormField::ProductNumber, "88881234".into()))
            .unwrap();
        session
            .dispatch(Action::EditForm(FormField::Quantity, "5".into()))
            .unwrap();
        session.dispatch(Action::SubmitItem).unwrap();

        assert_eq!(
            session.storage().raw(ITEMS_KEY).unwrap(),
            r#"[{"productNumber":"88881234","quantity":5,"unit":"카톤","expiryDate":""}]"#
        );

        session.dispatch(Action::ClearItems).unwrap();
        assert_eq!(session.storage().raw(ITEMS_KEY).unwrap(), "[]");
    }

    #[test]
    fn test_storage_failure_is_a_warning() {
        let mut session = session_with(MemoryStorage::failing(), FakeEngine::ok("remote", ""), None);

        session.dispatch(Action::AddUnit("박스".into())).unwrap();

        // The change stays in memory; the user is told it was not saved
        assert_eq!(session.state().units.len(), 3);
        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("포장 단위"));
    }

    #[test]
    fn test_retake_drops_surface() {
        let mut session = session_with(MemoryStorage::new(), FakeEngine::ok("remote", ""), None);
        session.load_image(&photo()).unwrap();
        session.dispatch(Action::Retake).unwrap();

        assert!(session.surface().is_none());
        session
            .dispatch(Action::ContainerResized { width: 195.0, height: 320.0 })
            .unwrap();
        assert!(session.surface().is_none());
        assert_eq!(
            session.dispatch(Action::RequestRecognition),
            Err(InputError::NoImage)
        );
    }
}
