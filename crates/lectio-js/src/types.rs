//! Types exposed to JavaScript via wasm-bindgen.

use lectio_browser::StoreStatus;
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

/// Store activity as the host page sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct JsStatus {
    /// One of `ready`, `loading`, `saving`, `deleting`, `saved`, `failed`.
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub busy: bool,
}

impl From<&StoreStatus> for JsStatus {
    fn from(status: &StoreStatus) -> Self {
        let (state, message) = match status {
            StoreStatus::Ready => ("ready", None),
            StoreStatus::Loading => ("loading", None),
            StoreStatus::Saving => ("saving", None),
            StoreStatus::Deleting => ("deleting", None),
            StoreStatus::Saved => ("saved", None),
            StoreStatus::Failed(message) => ("failed", Some(message.clone())),
        };
        Self {
            state: state.to_string(),
            message,
            busy: status.is_busy(),
        }
    }
}

/// Screen position for the color menu, in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct JsAnchor {
    pub x: f64,
    pub y: f64,
}

impl From<lectio_browser::AnchorPoint> for JsAnchor {
    fn from(anchor: lectio_browser::AnchorPoint) -> Self {
        Self {
            x: anchor.x,
            y: anchor.y,
        }
    }
}
