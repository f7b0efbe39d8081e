//! JavaScript interop for browser speech recognition.
//! Provides Rust bindings to the helpers defined in voice_helpers.js.

use log::warn;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(module = "/voice_helpers.js")]
extern "C" {
    #[wasm_bindgen(js_name = isVoiceSupported)]
    pub fn is_voice_supported() -> bool;

    #[wasm_bindgen(js_name = startVoice)]
    fn start_voice(
        on_transcript: &Closure<dyn FnMut(String)>,
        on_error: &Closure<dyn FnMut(String)>,
    ) -> bool;

    #[wasm_bindgen(js_name = stopVoice)]
    fn stop_voice();
}

/// A running recognition session. Dropping it stops listening.
pub struct VoiceSession {
    _on_transcript: Closure<dyn FnMut(String)>,
    _on_error: Closure<dyn FnMut(String)>,
}

impl VoiceSession {
    /// Start listening. Final transcripts go to `on_transcript`.
    pub fn start(
        on_transcript: impl FnMut(String) + 'static,
        on_error: impl FnMut(String) + 'static,
    ) -> Option<Self> {
        let on_transcript = Closure::wrap(Box::new(on_transcript) as Box<dyn FnMut(String)>);
        let on_error = Closure::wrap(Box::new(on_error) as Box<dyn FnMut(String)>);
        if !start_voice(&on_transcript, &on_error) {
            warn!("Speech recognition could not be started");
            return None;
        }
        Some(VoiceSession {
            _on_transcript: on_transcript,
            _on_error: on_error,
        })
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        stop_voice();
    }
}
