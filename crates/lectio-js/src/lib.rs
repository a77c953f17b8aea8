//! WASM bindings for the lectio passage reader.
//!
//! A host page mounts a `JsReader` on its passage container, pushes passage
//! markup and highlight lists into it, and receives create/delete/menu
//! callbacks. Persistence stays on the JS side.

mod reader;
mod types;

pub use reader::*;
pub use types::*;

use wasm_bindgen::prelude::*;

/// Install the panic hook and console logging.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    {
        use tracing::Level;
        use tracing::subscriber::set_global_default;
        use tracing_subscriber::Registry;
        use tracing_subscriber::layer::SubscriberExt;

        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        let wasm_layer = tracing_wasm::WASMLayer::new(
            tracing_wasm::WASMLayerConfigBuilder::new()
                .set_max_level(console_level)
                .build(),
        );

        // A host that already installed a subscriber keeps it.
        let _ = set_global_default(Registry::default().with(wasm_layer));
    }
}
