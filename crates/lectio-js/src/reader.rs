//! JsReader - the mounted reader exposed to JavaScript.

use lectio_browser::{
    AnchorPoint, Highlight, HighlightColor, HighlightId, NewHighlight, Passage, ReaderController,
    ReaderHost,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::types::{JsAnchor, JsStatus};

/// Host callbacks supplied by the page.
struct JsHost {
    on_create: Option<js_sys::Function>,
    on_delete: Option<js_sys::Function>,
    on_menu: Option<js_sys::Function>,
}

impl JsHost {
    fn call(callback: &Option<js_sys::Function>, arg: &JsValue) {
        let Some(callback) = callback else {
            return;
        };
        if let Err(e) = callback.call1(&JsValue::null(), arg) {
            tracing::warn!(target: "lectio::js", "host callback threw: {:?}", e);
        }
    }
}

impl ReaderHost for JsHost {
    fn create(&self, highlight: NewHighlight) {
        match to_js(&highlight) {
            Ok(value) => Self::call(&self.on_create, &value),
            Err(e) => tracing::warn!(target: "lectio::js", "cannot serialize highlight: {}", e),
        }
    }

    fn delete(&self, id: HighlightId) {
        Self::call(&self.on_delete, &JsValue::from_f64(id.0 as f64));
    }

    fn menu(&self, anchor: Option<AnchorPoint>) {
        let value = match anchor.map(JsAnchor::from) {
            Some(anchor) => to_js(&anchor).unwrap_or(JsValue::NULL),
            None => JsValue::NULL,
        };
        Self::call(&self.on_menu, &value);
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
}

fn js_error(context: &str, e: impl std::fmt::Display) -> JsError {
    JsError::new(&format!("{}: {}", context, e))
}

/// A reader mounted on one passage container.
///
/// `onCreate(highlight)` receives `{day_key, color_tag, selected_text}`,
/// `onDelete(id)` a numeric id, and `onMenu(anchor)` either `{x, y}` or
/// `null` to hide the menu. After persisting, call `setHighlights` with the
/// store's list for the day.
#[wasm_bindgen]
pub struct JsReader {
    inner: ReaderController<JsHost>,
}

#[wasm_bindgen]
impl JsReader {
    /// Mount on the element with id `container_id`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        container_id: &str,
        on_create: Option<js_sys::Function>,
        on_delete: Option<js_sys::Function>,
        on_menu: Option<js_sys::Function>,
    ) -> Result<JsReader, JsError> {
        let host = JsHost {
            on_create,
            on_delete,
            on_menu,
        };
        let inner = ReaderController::mount_by_id(container_id, host)
            .map_err(|e| js_error("Failed to mount reader", e))?;
        Ok(Self { inner })
    }

    /// Show a passage (`{dayKey, formattedDate, passageHtml}`) with the
    /// day's highlight list. Returns the render report.
    #[wasm_bindgen(js_name = showPassage)]
    pub fn show_passage(&self, passage: JsValue, highlights: JsValue) -> Result<JsValue, JsError> {
        let passage: Passage = serde_wasm_bindgen::from_value(passage)
            .map_err(|e| js_error("Invalid passage", e))?;
        let highlights = parse_highlights(highlights)?;
        let report = self
            .inner
            .show(passage, highlights)
            .map_err(|e| js_error("Render failed", e))?;
        to_js(&report).map_err(|e| js_error("Serialization error", e))
    }

    /// Replace the highlight list with the store's and re-render.
    #[wasm_bindgen(js_name = setHighlights)]
    pub fn set_highlights(&self, highlights: JsValue) -> Result<JsValue, JsError> {
        let highlights = parse_highlights(highlights)?;
        let report = self
            .inner
            .set_highlights(highlights)
            .map_err(|e| js_error("Render failed", e))?;
        to_js(&report).map_err(|e| js_error("Serialization error", e))
    }

    /// The color menu reported a choice (`green`, `pink` or `blue`).
    #[wasm_bindgen(js_name = chooseColor)]
    pub fn choose_color(&self, color: &str) -> Result<(), JsError> {
        let color: HighlightColor = color.parse().map_err(|e| js_error("Invalid color", e))?;
        self.inner.choose_color(color);
        Ok(())
    }

    /// The color menu was dismissed without a choice.
    #[wasm_bindgen]
    pub fn dismiss(&self) {
        self.inner.dismiss();
    }

    /// Record a failed store call. The rendered view is left as is.
    #[wasm_bindgen(js_name = reportFailure)]
    pub fn report_failure(&self, message: &str) {
        self.inner.report_failure(message);
    }

    #[wasm_bindgen]
    pub fn status(&self) -> JsStatus {
        JsStatus::from(&self.inner.status())
    }

    /// Highlights currently drawn.
    #[wasm_bindgen]
    pub fn highlights(&self) -> Result<JsValue, JsError> {
        to_js(&self.inner.highlights()).map_err(|e| js_error("Serialization error", e))
    }

    /// Report of the most recent render pass.
    #[wasm_bindgen(js_name = lastReport)]
    pub fn last_report(&self) -> Result<JsValue, JsError> {
        to_js(&self.inner.last_report()).map_err(|e| js_error("Serialization error", e))
    }

    /// Whether a selection is waiting for a color choice.
    #[wasm_bindgen(js_name = isPending)]
    pub fn is_pending(&self) -> bool {
        self.inner.is_pending()
    }
}

fn parse_highlights(value: JsValue) -> Result<Vec<Highlight>, JsError> {
    if value.is_null() || value.is_undefined() {
        return Ok(Vec::new());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| js_error("Invalid highlight list", e))
}
